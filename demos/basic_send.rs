//! Minimal wiring harness: load config, open the link, spawn the receiver
//! and dispatch loops, send one message to a target unit.
//!
//! Not a general-purpose CLI — just enough to exercise the driver end to
//! end against a real or loopback serial device.

use embassy_executor::Executor;
use nxdn_pcip_driver::{Communicator, DriverConfig, Radio, SerialLink, UnitId, dispatch_task, receiver_task};
use std::path::PathBuf;

#[embassy_executor::task]
async fn run(config_path: PathBuf, target: String, message: String) {
    let cfg = DriverConfig::load(&config_path).expect("failed to load config");
    let link = SerialLink::open(&cfg.serial_url, cfg.serial_baudrate).expect("failed to open serial link");
    let radio: &'static Radio = Radio::new(link, &cfg);
    let communicator: &'static Communicator = Box::leak(Box::new(Communicator::new(radio, &cfg)));

    let spawner = unsafe { embassy_executor::Spawner::for_current_executor() }.await;
    spawner.spawn(receiver_task(radio)).unwrap();
    spawner.spawn(dispatch_task(communicator)).unwrap();

    if let Err(e) = radio.setup(&cfg).await {
        log::error!("radio setup (auto-repeat/baudrate) failed: {e}");
    }

    let target = UnitId::parse(&target).expect("target must be a 5-digit unit id");
    let payload = serde_json::json!({ "text": message });
    match communicator.send(target, payload, serde_json::Map::new()).await {
        Ok(true) => log::info!("delivered to {target}"),
        Ok(false) => log::warn!("radio reported failed confirmation sending to {target}"),
        Err(e) => log::error!("send to {target} failed: {e}"),
    }

    communicator.shutdown();
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config_path = PathBuf::from(args.next().unwrap_or_else(|| "config.toml".to_string()));
    let target = args.next().expect("usage: nxdn-demo <config.toml> <target-unit-id> <message>");
    let message = args.next().expect("usage: nxdn-demo <config.toml> <target-unit-id> <message>");

    let executor: &'static mut Executor = Box::leak(Box::new(Executor::new()));
    executor.run(|spawner| {
        spawner.spawn(run(config_path, target, message)).unwrap();
    });
}
