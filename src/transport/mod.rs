// Transport layer module
// Outbound clients for the upstream runs administration API
//
// Numan Thabit 2025 Nov

pub mod tfe;

pub use tfe::TfeClient;
