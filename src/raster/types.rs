use std::ffi::CString;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub use gdal_sys::GDALDataType;
use gdal_sys::{GDALGetDataTypeByName, GDALGetDataTypeName, GDALGetDataTypeSizeBytes};

use crate::errors::{Result, RetileError};
use crate::utils::_string;

/// A pixel data type as GDAL knows it (`Byte`, `UInt16`, `Float32`, ...).
///
/// Tiles are copied band by band without interpreting pixel values, so the type is
/// carried around as a runtime value rather than a Rust type parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DataType(GDALDataType::Type);

impl DataType {
    /// Wrap a raw type. Returns `None` for `GDT_Unknown` and out of range values.
    pub fn from_gdal(gdal_type: GDALDataType::Type) -> Option<Self> {
        let data_type = DataType(gdal_type);
        if gdal_type == GDALDataType::GDT_Unknown || data_type.size_bytes() == 0 {
            None
        } else {
            Some(data_type)
        }
    }

    /// Look up a type by its GDAL name. Matching is case-insensitive, like `-ot` in
    /// the GDAL utilities.
    pub fn from_name(name: &str) -> Result<Self> {
        let c_name = CString::new(name)?;
        let gdal_type = unsafe { GDALGetDataTypeByName(c_name.as_ptr()) };
        DataType::from_gdal(gdal_type)
            .ok_or_else(|| RetileError::BadArgument(format!("Unknown data type: '{name}'")))
    }

    pub(crate) fn unknown() -> Self {
        DataType(GDALDataType::GDT_Unknown)
    }

    pub fn gdal_type(&self) -> GDALDataType::Type {
        self.0
    }

    pub fn name(&self) -> String {
        _string(unsafe { GDALGetDataTypeName(self.0) })
    }

    /// Size of one pixel in bytes.
    pub fn size_bytes(&self) -> usize {
        (unsafe { GDALGetDataTypeSizeBytes(self.0) }) as usize
    }
}

impl FromStr for DataType {
    type Err = RetileError;

    fn from_str(s: &str) -> Result<Self> {
        DataType::from_name(s)
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        let byte = DataType::from_name("Byte").unwrap();
        assert_eq!(byte.gdal_type(), GDALDataType::GDT_Byte);
        assert_eq!(byte.size_bytes(), 1);

        let float = "float32".parse::<DataType>().unwrap();
        assert_eq!(float.name(), "Float32");
        assert_eq!(float.size_bytes(), 4);
        assert_eq!(float.to_string(), "Float32");
    }

    #[test]
    fn test_unknown_name() {
        assert!(DataType::from_name("Pixel").is_err());
        assert!(DataType::from_gdal(GDALDataType::GDT_Unknown).is_none());
    }
}
