//! Attachment CLI Demo
//!
//! Lines typed on stdin are written into an attachment; three blocking
//! readers print what they receive. The second reader closes early and drains.
//!
//! An optional first argument names a JSON config file.

use attachment::{
    AttachmentConfig, AttachmentReader, AttachmentWriter, ClosePoint, InProcessAttachment,
    InProcessReader, ReadStatus, ReaderPolicy, WriteStatus, WriterPolicy,
};
use std::io::{self, BufRead};
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => AttachmentConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => AttachmentConfig::new(64, 1, 3),
    };
    let attachment = InProcessAttachment::new("demo", config)?;

    let writer = attachment.create_writer(WriterPolicy::Nonblockable)?;
    let reader1 = attachment.create_reader(ReaderPolicy::Blocking)?;
    let reader2 = attachment.create_reader(ReaderPolicy::Blocking)?;
    let reader3 = attachment.create_reader(ReaderPolicy::Blocking)?;

    let writer_thread = thread::spawn(move || {
        println!("Enter text (empty line to quit):");
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();

        while let Some(Ok(line)) = lines.next() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }

            let outcome = writer.write(trimmed.as_bytes(), Duration::ZERO);
            if outcome.status != WriteStatus::Ok {
                eprintln!("Write error: {}", outcome.status);
                break;
            }
        }

        writer.close();
        println!("Writer closed");
    });

    let reader2 = std::sync::Arc::new(reader2);
    let closer = std::sync::Arc::clone(&reader2);

    let reader_threads = vec![
        thread::spawn(move || read_all("r1", &reader1)),
        thread::spawn(move || read_all("r2", &reader2)),
        thread::spawn(move || read_all("r3", &reader3)),
    ];

    // r2 stops after whatever is buffered a few seconds in
    thread::sleep(Duration::from_secs(5));
    closer.close(ClosePoint::AfterDrainingCurrentBuffer);

    let _ = writer_thread.join();
    for handle in reader_threads {
        let _ = handle.join();
    }

    println!("All readers finished");
    Ok(())
}

fn read_all(name: &str, reader: &InProcessReader) {
    let mut buf = [0u8; 4];

    loop {
        let outcome = reader.read(&mut buf, Duration::from_millis(500));
        match outcome.status {
            ReadStatus::Ok | ReadStatus::OkWouldBlock | ReadStatus::OkTimedOut => {
                if outcome.bytes > 0 {
                    let data = String::from_utf8_lossy(&buf[..outcome.bytes]);
                    println!("({name}): {data}");
                }
            }
            ReadStatus::Closed => {
                println!("({name}) EOF");
                break;
            }
            ReadStatus::ErrorOverrun
            | ReadStatus::ErrorBytesLessThanWordSize
            | ReadStatus::ErrorInternal => {
                eprintln!("({name}) Error: {}", outcome.status);
                break;
            }
        }
    }
}
