pub mod recent;
pub mod server;
pub mod settings;
pub mod tree;
pub mod util;
pub mod window;
