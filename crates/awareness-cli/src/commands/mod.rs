pub mod export;
pub mod import;
pub mod ls;
pub mod recent;
pub mod repair;
pub mod show;
