mod response;

pub use response::ApiResponse;
