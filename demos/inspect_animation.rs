//! Inspect the frame structure of an APNG file
use apng_container::Apng;
use std::env;

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <apng-file>", args[0]);
        std::process::exit(1);
    }

    let path = &args[1];
    match Apng::open(path) {
        Ok(apng) => {
            println!("File: {}", path);
            println!("Number of frames: {}", apng.frame_count());
            println!("Loop count: {} (0 = infinite)", apng.num_plays());

            for (i, frame) in apng.frames().iter().enumerate() {
                let c = &frame.control;
                let data_bytes: u64 = frame
                    .image
                    .chunks()
                    .iter()
                    .filter(|ch| ch.kind() == apng_container::chunks::IDAT)
                    .map(|ch| u64::from(ch.data_len()))
                    .sum();
                println!(
                    "  Frame {}: {}x{} at ({}, {}), delay {}/{}, {} bytes of image data",
                    i, c.width, c.height, c.x_offset, c.y_offset, c.delay_num, c.delay_den, data_bytes
                );
            }
        }
        Err(e) => {
            eprintln!("Parse error: {}", e);
            std::process::exit(1);
        }
    }
}
