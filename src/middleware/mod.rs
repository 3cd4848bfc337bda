mod recover;
mod request_id;

pub use recover::catch_panic_layer;
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
