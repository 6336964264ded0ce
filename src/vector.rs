//! Minimal OGR write support: one polygon layer with one string attribute, which is
//! all a tile index needs.

use std::ffi::CString;
use std::path::Path;
use std::ptr;

use gdal_sys::{
    OGRErr, OGRFeatureH, OGRFieldType, OGRGeometryH, OGRLayerH, OGRwkbGeometryType,
};
use geo_types::Rect;

use crate::dataset::Dataset;
use crate::driver::Driver;
use crate::errors::*;
use crate::spatial_ref::SpatialRef;
use crate::utils::_last_null_pointer_err;

/// Width of the attribute holding tile paths.
pub const LOCATION_FIELD_WIDTH: i32 = 256;

fn ogr_result(rv: OGRErr::Type, method_name: &'static str) -> Result<()> {
    if rv != OGRErr::OGRERR_NONE {
        return Err(RetileError::OgrError {
            err: rv,
            method_name,
        });
    }
    Ok(())
}

/// A polygon layer being written into a vector dataset.
pub struct PolygonLayer<'a> {
    c_layer: OGRLayerH,
    _dataset: &'a Dataset,
}

impl<'a> PolygonLayer<'a> {
    /// Create a polygon layer named `name` with a single string field `field_name`.
    pub fn create(
        dataset: &'a Dataset,
        name: &str,
        field_name: &str,
        srs: Option<&SpatialRef>,
    ) -> Result<Self> {
        let c_name = CString::new(name)?;
        let c_srs = match srs {
            Some(srs) => unsafe { srs.to_c_hsrs() },
            None => ptr::null_mut(),
        };
        let c_layer = unsafe {
            gdal_sys::GDALDatasetCreateLayer(
                dataset.c_dataset(),
                c_name.as_ptr(),
                c_srs,
                OGRwkbGeometryType::wkbPolygon,
                ptr::null_mut(),
            )
        };
        if c_layer.is_null() {
            return Err(_last_null_pointer_err("GDALDatasetCreateLayer"));
        }

        let c_field_name = CString::new(field_name)?;
        let c_field_defn =
            unsafe { gdal_sys::OGR_Fld_Create(c_field_name.as_ptr(), OGRFieldType::OFTString) };
        unsafe { gdal_sys::OGR_Fld_SetWidth(c_field_defn, LOCATION_FIELD_WIDTH) };
        let rv = unsafe { gdal_sys::OGR_L_CreateField(c_layer, c_field_defn, 1) };
        unsafe { gdal_sys::OGR_Fld_Destroy(c_field_defn) };
        ogr_result(rv, "OGR_L_CreateField")?;

        Ok(PolygonLayer {
            c_layer,
            _dataset: dataset,
        })
    }

    /// Append one feature whose geometry is the outline of `rect`.
    pub fn add_rect(&mut self, value: &str, rect: &Rect<f64>) -> Result<()> {
        let c_value = CString::new(value)?;
        let c_defn = unsafe { gdal_sys::OGR_L_GetLayerDefn(self.c_layer) };
        let c_feature: OGRFeatureH = unsafe { gdal_sys::OGR_F_Create(c_defn) };
        if c_feature.is_null() {
            return Err(_last_null_pointer_err("OGR_F_Create"));
        }

        let result = (|| {
            unsafe { gdal_sys::OGR_F_SetFieldString(c_feature, 0, c_value.as_ptr()) };
            let c_polygon = rect_to_polygon(rect)?;
            let rv = unsafe { gdal_sys::OGR_F_SetGeometryDirectly(c_feature, c_polygon) };
            ogr_result(rv, "OGR_F_SetGeometryDirectly")?;
            let rv = unsafe { gdal_sys::OGR_L_CreateFeature(self.c_layer, c_feature) };
            ogr_result(rv, "OGR_L_CreateFeature")
        })();
        unsafe { gdal_sys::OGR_F_Destroy(c_feature) };
        result
    }
}

fn rect_to_polygon(rect: &Rect<f64>) -> Result<OGRGeometryH> {
    let c_ring = unsafe { gdal_sys::OGR_G_CreateGeometry(OGRwkbGeometryType::wkbLinearRing) };
    if c_ring.is_null() {
        return Err(_last_null_pointer_err("OGR_G_CreateGeometry"));
    }
    let (min, max) = (rect.min(), rect.max());
    // Clockwise from the upper-left corner, closed.
    for (x, y) in [
        (min.x, max.y),
        (max.x, max.y),
        (max.x, min.y),
        (min.x, min.y),
        (min.x, max.y),
    ] {
        unsafe { gdal_sys::OGR_G_AddPoint_2D(c_ring, x, y) };
    }

    let c_polygon = unsafe { gdal_sys::OGR_G_CreateGeometry(OGRwkbGeometryType::wkbPolygon) };
    if c_polygon.is_null() {
        unsafe { gdal_sys::OGR_G_DestroyGeometry(c_ring) };
        return Err(_last_null_pointer_err("OGR_G_CreateGeometry"));
    }
    let rv = unsafe { gdal_sys::OGR_G_AddGeometryDirectly(c_polygon, c_ring) };
    if rv != OGRErr::OGRERR_NONE {
        unsafe { gdal_sys::OGR_G_DestroyGeometry(c_polygon) };
        return Err(RetileError::OgrError {
            err: rv,
            method_name: "OGR_G_AddGeometryDirectly",
        });
    }
    Ok(c_polygon)
}

/// Write `features` as a polygon layer into a new vector dataset at `path`, replacing
/// whatever dataset already exists there.
pub fn write_polygon_layer<'f, P, I>(
    driver_name: &str,
    path: P,
    field_name: &str,
    srs: Option<&SpatialRef>,
    features: I,
) -> Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = (&'f str, &'f Rect<f64>)>,
{
    let path = path.as_ref();
    let driver = Driver::get_by_name(driver_name)?;
    if path.exists() {
        driver.delete(path)?;
    }
    let dataset = driver.create_vector_only(path)?;
    let layer_name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut layer = PolygonLayer::create(&dataset, &layer_name, field_name, srs)?;
    for (value, rect) in features {
        layer.add_rect(value, rect)?;
    }
    Ok(())
}

/// Count the features of the first layer of a vector dataset.
pub fn feature_count<P: AsRef<Path>>(path: P) -> Result<u64> {
    let dataset = open_vector(path)?;
    let c_layer = unsafe { gdal_sys::GDALDatasetGetLayer(dataset.c_dataset(), 0) };
    if c_layer.is_null() {
        return Err(_last_null_pointer_err("GDALDatasetGetLayer"));
    }
    Ok(unsafe { gdal_sys::OGR_L_GetFeatureCount(c_layer, 1) } as u64)
}

fn open_vector<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    crate::driver::_register_drivers();
    let c_filename = crate::utils::_path_to_c_string(path)?;
    let c_dataset = unsafe {
        gdal_sys::GDALOpenEx(
            c_filename.as_ptr(),
            gdal_sys::GDAL_OF_VECTOR,
            ptr::null(),
            ptr::null(),
            ptr::null(),
        )
    };
    if c_dataset.is_null() {
        return Err(_last_null_pointer_err("GDALOpenEx"));
    }
    Ok(unsafe { Dataset::from_c_dataset(c_dataset) })
}
