use groundspeed::camera::StillCommand;
use groundspeed::{driver, Settings};
use log::*;

fn main() {
    pretty_env_logger::init_timed();
    let settings = Settings::default();
    let mut camera = StillCommand::new(&settings);
    let speed = driver::run(&mut camera, &settings).expect("measurement run failed");
    info!("estimated ground speed: {speed:.5} km/s");
}
