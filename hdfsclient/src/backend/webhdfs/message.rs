// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! WebHDFS response messages

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::path;
use crate::status::{FileKind, PathStatus, Permission};

#[derive(Debug, Deserialize)]
pub(super) struct BooleanResp {
    pub boolean: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct LocationResponse {
    pub location: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct FileStatusWrapper {
    pub file_status: FileStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct FileStatusesWrapper {
    pub file_statuses: FileStatuses,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct FileStatuses {
    pub file_status: Vec<FileStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct FileStatus {
    pub length: u64,
    pub modification_time: i64,
    pub access_time: i64,
    pub path_suffix: String,
    pub permission: String,
    pub replication: u16,
    pub block_size: u64,
    pub owner: String,
    pub group: String,
    #[serde(rename = "type")]
    pub ty: FileStatusType,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub(super) enum FileStatusType {
    Directory,
    #[default]
    File,
    Symlink,
}

fn millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

impl FileStatus {
    /// `path` is the status target for GETFILESTATUS, or the listed
    /// directory for LISTSTATUS entries (which carry a `pathSuffix`).
    pub fn into_status(self, path: &str) -> PathStatus {
        let full = if self.path_suffix.is_empty() {
            path.to_string()
        } else {
            path::join(path, &self.path_suffix)
        };
        let kind = match self.ty {
            FileStatusType::Directory => FileKind::Directory,
            FileStatusType::File | FileStatusType::Symlink => FileKind::File,
        };
        PathStatus {
            name: path::file_name(&full).to_string(),
            path: full,
            kind,
            size: self.length,
            modified: millis(self.modification_time),
            accessed: millis(self.access_time),
            permission: Permission::from_octal(&self.permission).unwrap_or_default(),
            replication: self.replication,
            block_size: self.block_size,
            owner: self.owner,
            group: self.group,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_file_status() {
        let json = r#"
{
  "FileStatus":
  {
    "accessTime"      : 0,
    "blockSize"       : 0,
    "group"           : "supergroup",
    "length"          : 0,
    "modificationTime": 1320173277227,
    "owner"           : "webuser",
    "pathSuffix"      : "",
    "permission"      : "777",
    "replication"     : 0,
    "type"            : "DIRECTORY"
  }
}
"#;
        let status: FileStatusWrapper = serde_json::from_str(json).expect("must success");
        let st = status.file_status.into_status("/t");
        assert_eq!(st.kind, FileKind::Directory);
        assert_eq!(st.path, "/t");
        assert_eq!(st.name, "t");
        assert_eq!(st.permission.bits(), 0o777);
        assert_eq!(st.modified.timestamp_millis(), 1320173277227);
        assert_eq!(st.owner, "webuser");
    }

    #[test]
    fn test_list_status() {
        let json = r#"
{
  "FileStatuses":
  {
    "FileStatus":
    [
      {
        "accessTime"      : 1320171722771,
        "blockSize"       : 33554432,
        "group"           : "supergroup",
        "length"          : 24930,
        "modificationTime": 1320171722771,
        "owner"           : "webuser",
        "pathSuffix"      : "a.patch",
        "permission"      : "644",
        "replication"     : 1,
        "type"            : "FILE"
      },
      {
        "accessTime"      : 0,
        "blockSize"       : 0,
        "group"           : "supergroup",
        "length"          : 0,
        "modificationTime": 1320895981256,
        "owner"           : "szetszwo",
        "pathSuffix"      : "bar",
        "permission"      : "711",
        "replication"     : 0,
        "type"            : "DIRECTORY"
      }
    ]
  }
}
            "#;

        let statuses: Vec<PathStatus> = serde_json::from_str::<FileStatusesWrapper>(json)
            .expect("must success")
            .file_statuses
            .file_status
            .into_iter()
            .map(|s| s.into_status("/"))
            .collect();

        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].path, "/a.patch");
        assert_eq!(statuses[0].size, 24930);
        assert_eq!(statuses[0].block_size, 33554432);
        assert_eq!(statuses[0].replication, 1);
        assert!(statuses[0].is_file());
        assert_eq!(statuses[1].path, "/bar");
        assert!(statuses[1].is_dir());
    }

    #[test]
    fn test_list_empty() {
        let json = r#"{ "FileStatuses": {"FileStatus":[]} }"#;
        let file_statuses = serde_json::from_str::<FileStatusesWrapper>(json)
            .expect("must success")
            .file_statuses
            .file_status;
        assert!(file_statuses.is_empty());
    }
}
