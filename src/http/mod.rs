pub mod client;
pub mod request;
pub mod response;

pub use client::{build_client, submit_record};
pub use request::{Endpoint, Transport};
pub use response::SubmitOutcome;
