use std::ffi::CString;
use std::io;
use std::sync::{Arc, Mutex};

use gdal_retile::config;
use gdal_retile::Dataset;
use gdal_sys::{CPLErr, CPLError};

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_error_handler() {
    // The CPL error handler is process global, so the scenarios run sequentially.

    gdal_messages_reach_tracing();

    errors_still_surface_as_results();
}

fn gdal_messages_reach_tracing() {
    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        config::install_tracing_error_handler();

        let msg = CString::new("foo".as_bytes()).unwrap();
        unsafe {
            CPLError(CPLErr::CE_Failure, 42, msg.as_ptr());
        };

        let msg = CString::new("bar".as_bytes()).unwrap();
        unsafe {
            CPLError(CPLErr::CE_Warning, 1, msg.as_ptr());
        };

        config::remove_error_handler();
    });

    let output = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
    let lines: Vec<_> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("ERROR") && lines[0].contains("foo"));
    assert!(lines[0].contains("code=42"));
    assert!(lines[1].contains("WARN") && lines[1].contains("bar"));
}

fn errors_still_surface_as_results() {
    config::install_tracing_error_handler();
    let result = Dataset::open("/no/such/raster.tif");
    config::remove_error_handler();
    assert!(result.is_err());
}
