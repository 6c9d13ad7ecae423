//! Example: Mirror a synthetic gradient to a running bridge.
//!
//! Run with: `cargo run --example mirror`

use kraken_bridge::{
    BridgeClient, BridgeConfig, BridgeError, Device, DiscoveryService, Field, FieldValue, HttpTransport, ImageFormat,
    MockRegistry, Session,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// A device that renders a moving gradient instead of sampling a canvas.
struct Gradient {
    frame: u32,
}

impl Device for Gradient {
    fn capture(&mut self, width: u32, height: u32, _format: ImageFormat) -> Vec<u8> {
        self.frame = self.frame.wrapping_add(1);
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                pixels.push((x * 255 / width.max(1)).wrapping_add(self.frame) as u8);
                pixels.push((y * 255 / height.max(1)) as u8);
                pixels.push(self.frame.wrapping_mul(3) as u8);
            }
        }
        pixels
    }

    fn set_size(&mut self, width: u32, height: u32) {
        println!("device bounds: {}x{}", width, height);
    }

    fn brightness(&self) -> u8 {
        80
    }

    fn rotation(&self) -> i32 {
        0
    }

    fn set_name(&mut self, name: &str) {
        println!("device name: {}", name);
    }

    fn set_image(&mut self, encoded: &str) {
        println!("device image: {} bytes of base64", encoded.len());
    }
}

fn main() -> Result<(), BridgeError> {
    // Initialize logging (optional)
    env_logger::init();

    let config = BridgeConfig::from_env()?;
    let transport = Arc::new(HttpTransport::from_config(&config)?);
    let client = BridgeClient::new(transport, config);

    let mut discovery = DiscoveryService::new(client.clone(), Arc::new(MockRegistry::new()));
    discovery.initialize();

    // Wait for the bridge to answer a probe
    println!("Looking for a bridge at {}...", client.config().base_url);
    let deadline = Instant::now() + Duration::from_secs(10);
    let controller = loop {
        discovery.update(Instant::now());
        if let Some(controller) = discovery.controller() {
            break controller;
        }
        if Instant::now() > deadline {
            eprintln!("No bridge answered");
            return Ok(());
        }
        thread::sleep(Duration::from_millis(100));
    };

    let mut session = Session::new(Gradient { frame: 0 }, client);
    session.initialize(&controller);
    session.set_field(Field::Fps, FieldValue::text("10"))?;

    let end = Instant::now() + Duration::from_secs(5);
    let mut sent = 0;
    while Instant::now() < end {
        let now = Instant::now();
        discovery.update(now);
        if session.render(discovery.is_online(), now) {
            sent += 1;
        }
        thread::sleep(Duration::from_millis(16));
    }
    println!("Sent {} frames", sent);

    session.shutdown();
    Ok(())
}
