// Data models and pure normalizers shared by the engine and anything that
// consumes its reports (import screens, error reporters).

pub mod models;
pub mod utils;
