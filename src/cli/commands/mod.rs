mod config;
mod index;
mod status;
mod upload;

pub use config::ConfigCommand;
pub use index::IndexCommand;
pub use status::StatusArgs;
pub use upload::UploadArgs;

pub use config::handle_config;
pub use index::handle_index;
pub use status::handle_status;
pub use upload::handle_upload;
