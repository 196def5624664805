//! Constants for the download module.

/// Write buffer size; the response body reaches disk in blocks of this size.
pub const WRITE_CHUNK_BYTES: usize = 8192;

/// Extension of downloaded flight files.
pub const NETCDF_EXTENSION: &str = "nc";
