mod app;
mod config;
mod effects;
mod logging;
mod session;
#[cfg(test)]
mod test_support;
mod ui;

pub use app::run_app;
