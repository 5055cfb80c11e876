pub mod closure;
pub mod diff;
pub mod preview;
pub mod show;
