use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use capreplay_core::synth::{SynthPacket, udp_sequence, write_pcap, write_pcapng};

const DEFAULT_PACKETS: usize = 16;

fn main() -> ExitCode {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> Result<(), String> {
    let root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("fixtures"));
    fs::create_dir_all(&root)
        .map_err(|err| format!("failed to create {}: {}", root.display(), err))?;

    let packets = udp_sequence(DEFAULT_PACKETS)
        .map_err(|err| format!("failed to build frames: {}", err))?;
    write_one(&root.join("udp.pcap"), &packets, write_pcap)?;
    write_one(&root.join("udp.pcapng"), &packets, write_pcapng)?;
    write_one(&root.join("empty.pcap"), &[], write_pcap)?;
    Ok(())
}

fn write_one(
    path: &Path,
    packets: &[SynthPacket],
    write: fn(&Path, &[SynthPacket]) -> std::io::Result<()>,
) -> Result<(), String> {
    write(path, packets).map_err(|err| format!("failed to write {}: {}", path.display(), err))?;
    println!("wrote {} ({} packets)", path.display(), packets.len());
    Ok(())
}
