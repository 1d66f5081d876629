use std::{env, fs, path::PathBuf, sync::Arc, time::Duration};

use osc_rs::{
    client::PreviewEvent,
    module::{camera::Camera, theta::Theta},
    Client, Endpoint,
};

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// usage: osc_demo <ip> [port] [preview frames] [--shoot]
pub fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let ip = args.get(1).cloned().unwrap_or_else(|| "192.168.1.1".to_owned());
    let port: u16 = args
        .get(2)
        .map(|s| s.parse().expect("parse command port"))
        .unwrap_or(80);
    let frames: usize = args
        .get(3)
        .map(|s| s.parse().expect("parse frame count"))
        .unwrap_or(0);
    let shoot = args.iter().any(|a| a == "--shoot");

    let client = Arc::new(Client::new(Endpoint::new(ip, port)));
    info!("endpoint: {:?}", client.endpoint());

    let device = client.device_info();
    info!(
        "device: {} {} fw {} api {:?}",
        device.manufacturer, device.model, device.firmware_version, device.api_level
    );

    let state = client.camera_state().expect("get camera state");
    info!("state fingerprint {}: {:?}", state.fingerprint, state.state);

    let camera = Camera::new(client.clone());
    if shoot {
        info!("take picture");
        match camera.take_picture(None) {
            Ok(uri) => info!("stored at {}", uri),
            Err(e) => error!("take picture: {}", e),
        }

        match client.wait_for_updates(&state.fingerprint) {
            Ok(updates) => info!("state updated: {:?}", updates),
            Err(e) => warn!("check for updates: {}", e),
        }
    }

    if frames == 0 {
        return;
    }

    let theta = Theta::new(client.clone());
    let dir = PathBuf::from("preview");
    fs::create_dir_all(&dir).expect("create preview dir");

    let rx = theta.live_preview(None);
    let mut saved = 0;
    loop {
        match rx.recv_timeout(Duration::from_secs(10)) {
            Ok(Some(PreviewEvent::Frame(frame))) => {
                let path = dir.join(format!("frame_{:04}.jpg", saved));
                fs::write(&path, &frame).expect("write frame");
                info!("saved {} bytes to {:?}", frame.len(), path);

                saved += 1;
                if saved == frames {
                    break;
                }
            }

            Ok(Some(PreviewEvent::Closed(reason))) => {
                info!("preview closed: {:?}", reason);
                break;
            }

            Ok(None) => break,

            Err(e) => {
                warn!("waiting for preview frame: {}", e);
                break;
            }
        }
    }

    theta.stop_live_preview();
    info!("{} frames saved", saved);
}
