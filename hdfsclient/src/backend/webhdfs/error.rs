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

//! Translation of WebHDFS error responses.
//!
//! Failures arrive as `{"RemoteException": {...}}` bodies. The Java exception
//! name decides the error kind; the HTTP status is the fallback when the body
//! is not a remote exception.

use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WebHdfsErrorWrapper {
    pub remote_exception: WebHdfsError,
}

/// WebHdfsError is the error message returned by WebHdfs service
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebHdfsError {
    exception: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    #[allow(dead_code)]
    java_class_name: String,
}

pub(super) fn parse_error(status: StatusCode, body: &str, path: &str) -> Error {
    let remote = serde_json::from_str::<WebHdfsErrorWrapper>(body)
        .ok()
        .map(|w| w.remote_exception);
    let path = path.to_string();

    if let Some(e) = &remote {
        match e.exception.as_str() {
            "FileNotFoundException" => return Error::NotFound(path),
            "FileAlreadyExistsException" => return Error::AlreadyExists(path),
            "PathIsNotEmptyDirectoryException" => return Error::DirectoryNotEmpty(path),
            "ParentNotDirectoryException" => return Error::NotADirectory(path),
            "AccessControlException" | "SecurityException" => {
                return Error::PermissionDenied(path);
            }
            "IllegalArgumentException" | "InvalidPathException" => {
                return Error::InvalidArgument(format!("{path}: {}", e.message));
            }
            "UnsupportedOperationException" => {
                return Error::Unsupported(format!("{path}: {}", e.message));
            }
            _ => {}
        }
    }

    let detail = match remote {
        Some(e) => format!("{}: {}", e.exception, e.message),
        None => body.trim().to_string(),
    };
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(path),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::PermissionDenied(path),
        StatusCode::BAD_REQUEST => Error::InvalidArgument(format!("{path}: {detail}")),
        StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => {
            Error::Timeout(format!("{path}: {detail}"))
        }
        _ => Error::io(format!("{path}: HTTP {status}: {detail}")),
    }
}
