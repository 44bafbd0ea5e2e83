pub mod features;
pub mod lenient;
pub mod request;
pub mod result;
pub mod topology;
