mod config;
mod distributor;
mod error;
mod event;
mod library;
mod pacing;
mod playback;
mod playlist;
mod runtime;
mod session;
mod station;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
