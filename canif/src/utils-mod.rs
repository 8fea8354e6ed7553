/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * Redpesk interface code/config use MIT License and can be freely copy/modified even within proprietary code
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
*/

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error value returned by every fallible codec/filter operation.
/// `uid` is a stable machine readable tag, `info` a human readable detail.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone)]
pub struct CanError {
    uid: String,
    info: String,
}

pub trait MakeError<T> {
    fn make(uid: &str, msg: T) -> CanError;
}

impl MakeError<&str> for CanError {
    fn make(uid: &str, msg: &str) -> CanError {
        CanError { uid: uid.to_string(), info: msg.to_string() }
    }
}

impl MakeError<String> for CanError {
    fn make(uid: &str, msg: String) -> CanError {
        CanError { uid: uid.to_string(), info: msg }
    }
}

impl CanError {
    pub fn new<T>(uid: &str, msg: T) -> CanError
    where
        CanError: MakeError<T>,
    {
        Self::make(uid, msg)
    }

    #[must_use]
    pub fn get_uid(&self) -> &str {
        &self.uid
    }

    #[must_use]
    pub fn get_info(&self) -> &str {
        &self.info
    }
}

impl fmt::Display for CanError {
    fn fmt(&self, format: &mut fmt::Formatter) -> fmt::Result {
        write!(format, "uid:{} info:{}", self.uid, self.info)
    }
}

impl fmt::Debug for CanError {
    fn fmt(&self, format: &mut fmt::Formatter) -> fmt::Result {
        write!(format, "uid:{} info:{}", self.uid, self.info)
    }
}

impl std::error::Error for CanError {}
