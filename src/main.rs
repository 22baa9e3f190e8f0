use smw_sx1262m0::SmwSx1262m0;
use std::env::args;
use std::process::exit;

fn main() {
    let args: Vec<_> = args().collect();
    if args.len() <= 1 {
        eprintln!("smw-sx1262m0 <serial port>");
        eprintln!("\tPing the module and print its firmware version and device EUI.");
        exit(1);
    }

    let mut device = SmwSx1262m0::new_at(&args[1]).expect("Could not open device. Error");
    let (status, version) = device
        .get_version()
        .expect("Could not read from device. Error");
    println!(
        "Successfully connected ({}). Version: {}",
        status,
        version.unwrap_or_default()
    );
    let (status, dev_eui) = device
        .get_dev_eui()
        .expect("Could not read from device. Error");
    println!("DevEUI ({}): {}", status, dev_eui.unwrap_or_default());
}
