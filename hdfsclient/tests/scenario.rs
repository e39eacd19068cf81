//! End-to-end behavior through `ConnectionManager`, over the in-memory and
//! local-directory transports.

use hdfsclient::{ClientConfig, ConnectionManager, ErrorKind, FileKind, Session};

const PAYLOAD: &[u8] = b"hoho\0haha\nxixi";

fn memory_manager() -> ConnectionManager {
    ConnectionManager::new(ClientConfig {
        default_fs: Some("memory://scenario".into()),
        ..Default::default()
    })
}

fn local_manager(root: &std::path::Path) -> ConnectionManager {
    ConnectionManager::new(ClientConfig {
        default_fs: Some(format!("file://{}", root.display())),
        local_root: root.to_path_buf(),
        ..Default::default()
    })
}

async fn write_read_scenario(s: &Session) {
    let mut fh = s.open("/t/f", "w").await.unwrap();
    assert_eq!(fh.write(PAYLOAD).await.unwrap(), 14);
    fh.flush().await.unwrap();
    fh.close().await.unwrap();

    let mut fh = s.open("/t/f", "r").await.unwrap();
    assert_eq!(&fh.read(Some(5)).await.unwrap()[..], b"hoho\0");
    assert_eq!(&fh.read(None).await.unwrap()[..], b"haha\nxixi");
    fh.close().await.unwrap();
}

async fn stat_scenario(s: &Session) {
    s.mkdir("/fresh").await.unwrap();
    assert_eq!(s.stat("/fresh").await.unwrap().kind, FileKind::Directory);

    let mut fh = s.open("/fresh/data", "w").await.unwrap();
    fh.write(&[7u8; 1234]).await.unwrap();
    fh.close().await.unwrap();
    let st = s.stat("/fresh/data").await.unwrap();
    assert_eq!(st.kind, FileKind::File);
    assert_eq!(st.size, 1234);
}

async fn properties(s: &Session) {
    for p in ["/absent", "/a/b/c", "/t/f/child"] {
        assert!(!s.exists(p).await.unwrap(), "{p}");
        assert_eq!(s.stat(p).await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    // tell tracks bytes actually returned; pread leaves it alone
    let mut fh = s.open("/t/f", "r").await.unwrap();
    let mut expected = 0u64;
    for n in [3usize, 0, 6, 100, 4] {
        let before = fh.tell().unwrap();
        let got = fh.read(Some(n)).await.unwrap();
        expected += got.len() as u64;
        assert_eq!(fh.tell().unwrap(), before + got.len() as u64);
        fh.pread(2, Some(4)).await.unwrap();
        assert_eq!(fh.tell().unwrap(), expected);
    }
    assert_eq!(expected, PAYLOAD.len() as u64);
    fh.close().await.unwrap();

    assert!(s.mkdir("/idem").await.unwrap());
    assert!(s.mkdir("/idem").await.unwrap());

    s.mkdir("/tree/sub").await.unwrap();
    let mut fh = s.open("/tree/sub/leaf", "w").await.unwrap();
    fh.close().await.unwrap();
    assert_eq!(
        s.delete("/tree", false).await.unwrap_err().kind(),
        ErrorKind::DirectoryNotEmpty
    );
    assert!(s.delete("/tree", true).await.unwrap());
    assert!(!s.exists("/tree").await.unwrap());
}

#[tokio::test]
async fn test_default_connect_scenario_in_memory() {
    let mgr = memory_manager();
    let s = mgr.connect("default", 0).await.unwrap();
    write_read_scenario(&s).await;
    stat_scenario(&s).await;
    properties(&s).await;
    mgr.disconnect(&s).unwrap();
}

#[tokio::test]
async fn test_default_connect_scenario_on_local_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let mgr = local_manager(tmp.path());
    let s = mgr.connect("default", 0).await.unwrap();
    write_read_scenario(&s).await;
    stat_scenario(&s).await;
    properties(&s).await;
    mgr.disconnect(&s).unwrap();

    // the bytes landed under the configured root
    assert_eq!(std::fs::read(tmp.path().join("t/f")).unwrap(), PAYLOAD);
}

#[tokio::test]
async fn test_empty_host_is_local_filesystem() {
    let tmp = tempfile::tempdir().unwrap();
    let mgr = local_manager(tmp.path());
    let s = mgr.connect("", 0).await.unwrap();

    let src = tmp.path().join("upload.txt");
    std::fs::write(&src, PAYLOAD).unwrap();
    assert_eq!(s.put(&src, "/copies/one").await.unwrap(), 14);
    assert!(tmp.path().join("copies/one").is_file());

    let back = tmp.path().join("download.txt");
    assert_eq!(s.get("/copies/one", &back).await.unwrap(), 14);
    assert_eq!(std::fs::read(&back).unwrap(), PAYLOAD);
    mgr.disconnect(&s).unwrap();
}

#[tokio::test]
async fn test_concurrent_handles_on_one_session() {
    let mgr = memory_manager();
    let s = mgr.connect("default", 0).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..8u8 {
        let s = s.clone();
        tasks.push(tokio::spawn(async move {
            let path = format!("/par/{i}");
            let body = vec![i; 1000 + i as usize];
            let mut w = s.open(&path, "w").await.unwrap();
            for piece in body.chunks(97) {
                w.write(piece).await.unwrap();
            }
            w.close().await.unwrap();

            let mut r = s.open(&path, "r").await.unwrap();
            assert_eq!(r.read(None).await.unwrap(), body);
            r.close().await.unwrap();
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }
    assert_eq!(s.open_handles(), 0);
    assert_eq!(s.listdir("/par").await.unwrap().len(), 8);
    mgr.disconnect(&s).unwrap();
}

#[tokio::test]
async fn test_handles_cannot_outlive_disconnect() {
    let mgr = memory_manager();
    let s = mgr.connect("default", 0).await.unwrap();
    let mut fh = s.open("/x", "w").await.unwrap();
    assert_eq!(
        mgr.disconnect(&s).unwrap_err().kind(),
        ErrorKind::InvalidSession
    );
    fh.write(b"still usable").await.unwrap();
    fh.close().await.unwrap();
    mgr.disconnect(&s).unwrap();

    assert_eq!(
        s.open("/x", "r").await.unwrap_err().kind(),
        ErrorKind::InvalidSession
    );
    assert_eq!(
        s.exists("/x").await.unwrap_err().kind(),
        ErrorKind::InvalidSession
    );
}
