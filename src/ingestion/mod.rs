pub mod upload;

pub use upload::{parse_csv, parse_excel, parse_upload, UploadError, UploadKind};
