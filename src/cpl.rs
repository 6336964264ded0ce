//! Wrapper over GDAL's `char **` name/value string lists.

use std::ffi::{c_char, CString};
use std::ptr;

use gdal_sys::{CSLCount, CSLDestroy, CSLSetNameValue};

use crate::errors::{Result, RetileError};

/// Owns a `char **papszStrList`, the NULL terminated list of `KEY=VALUE` strings GDAL
/// takes for creation options. The list is released with `CSLDestroy` on drop.
pub struct CslStringList {
    list_ptr: *mut *mut c_char,
}

impl CslStringList {
    pub fn new() -> Self {
        Self {
            list_ptr: ptr::null_mut(),
        }
    }

    /// Assigns `value` to `name`, overwriting a previous value for the same name.
    pub fn set_name_value(&mut self, name: &str, value: &str) -> Result<()> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(RetileError::BadArgument(format!(
                "Invalid characters in name: '{name}'"
            )));
        }
        if value.contains(['\n', '\r']) {
            return Err(RetileError::BadArgument(format!(
                "Invalid characters in value: '{value}'"
            )));
        }
        let psz_name = CString::new(name)?;
        let psz_value = CString::new(value)?;

        unsafe {
            self.list_ptr = CSLSetNameValue(self.list_ptr, psz_name.as_ptr(), psz_value.as_ptr());
        }

        Ok(())
    }

    /// Parses a `NAME=VALUE` pair as given on the command line.
    pub fn add_string(&mut self, name_value: &str) -> Result<()> {
        match name_value.split_once('=') {
            Some((name, value)) => self.set_name_value(name.trim(), value),
            None => Err(RetileError::BadArgument(format!(
                "Expected NAME=VALUE, got '{name_value}'"
            ))),
        }
    }

    pub fn len(&self) -> usize {
        (unsafe { CSLCount(self.as_ptr()) }) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_ptr(&self) -> gdal_sys::CSLConstList {
        self.list_ptr
    }
}

impl Drop for CslStringList {
    fn drop(&mut self) {
        unsafe { CSLDestroy(self.list_ptr) }
    }
}

impl Default for CslStringList {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CslStringList {
    fn clone(&self) -> Self {
        let list_ptr = unsafe { gdal_sys::CSLDuplicate(self.list_ptr) };
        Self { list_ptr }
    }
}

impl std::fmt::Debug for CslStringList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CslStringList({} entries)", self.len())
    }
}

impl TryFrom<&[String]> for CslStringList {
    type Error = RetileError;

    fn try_from(values: &[String]) -> Result<Self> {
        let mut list = CslStringList::new();
        for value in values {
            list.add_string(value)?;
        }
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_string() {
        let mut list = CslStringList::new();
        list.add_string("COMPRESS=DEFLATE").unwrap();
        list.add_string("TILED=YES").unwrap();
        list.add_string("COMPRESS=LZW").unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut list = CslStringList::new();
        assert!(list.add_string("COMPRESS").is_err());
        assert!(list.set_name_value("BAD NAME", "x").is_err());
        assert!(list.set_name_value("NAME", "a\nb").is_err());
        assert!(list.is_empty());
    }
}
