mod app;
mod audio;
mod catalog;
mod config;
mod identity;
mod mpris;
mod runtime;
mod store;
mod ui;
mod upload;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
