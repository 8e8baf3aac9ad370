//! # Terrain Mesher Entry Point
//!
//! Native entry point for the tile build pipeline. It simply calls into the
//! library's `run()` function, which reads an optional JSON configuration path
//! from the command line and builds the configured tile pyramid.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- pipeline.json
//! ```

fn main() {
    terrain_mesher::run();
}
