use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use capreplay_core::synth::{
    PcapngWriter, SynthPacket, udp_frame, udp_sequence, write_pcap, write_pcapng,
};
use capreplay_core::{
    Linktype, PacketSource, Pass, PcapFileOpener, PcapFileSource, SourceError, SourceOpener,
};
use tempfile::TempDir;

fn collect(source: &mut PcapFileSource) -> (Pass, Vec<Vec<u8>>) {
    let mut frames = Vec::new();
    let pass = source
        .for_each_packet(|packet| {
            assert_eq!(packet.linktype, Linktype::ETHERNET);
            assert_eq!(packet.len(), packet.data.len());
            frames.push(packet.data.to_vec());
            ControlFlow::Continue(())
        })
        .unwrap();
    (pass, frames)
}

fn fixture(dir: &TempDir, name: &str, packets: &[SynthPacket]) -> PathBuf {
    let path = dir.path().join(name);
    if name.ends_with(".pcapng") {
        write_pcapng(&path, packets).unwrap();
    } else {
        write_pcap(&path, packets).unwrap();
    }
    path
}

fn expected(packets: &[SynthPacket]) -> Vec<Vec<u8>> {
    packets.iter().map(|p| p.data.clone()).collect()
}

#[test]
fn pcap_source_reads_packets_in_file_order() {
    let temp = TempDir::new().unwrap();
    let packets = udp_sequence(6).unwrap();
    let path = fixture(&temp, "input.pcap", &packets);

    let mut source = PcapFileSource::open(&path).unwrap();
    let (pass, frames) = collect(&mut source);

    assert_eq!(pass, Pass::Exhausted { packets: 6 });
    assert_eq!(frames, expected(&packets));
}

#[test]
fn pcapng_source_strips_block_padding() {
    let temp = TempDir::new().unwrap();
    let packets = udp_sequence(5).unwrap();
    assert!(packets.iter().any(|p| p.data.len() % 4 != 0));
    let path = fixture(&temp, "input.pcapng", &packets);

    let mut source = PcapFileSource::open(&path).unwrap();
    let (pass, frames) = collect(&mut source);

    assert_eq!(pass.packets(), 5);
    assert_eq!(frames, expected(&packets));
}

#[test]
fn pcapng_timestamps_are_seconds() {
    let temp = TempDir::new().unwrap();
    let path = fixture(&temp, "input.pcapng", &udp_sequence(3).unwrap());

    let mut source = PcapFileSource::open(&path).unwrap();
    let mut stamps = Vec::new();
    source
        .for_each_packet(|packet| {
            stamps.push(packet.ts.unwrap());
            ControlFlow::Continue(())
        })
        .unwrap();

    assert_eq!(stamps, [0.0, 1.0, 2.0]);
}

#[test]
fn pcapng_timestamps_follow_interface_resolution() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("mixed.pcapng");
    let frame = udp_frame(4000, &[1, 2, 3]).unwrap();
    let bytes = PcapngWriter::new()
        .interface(1, None)
        .interface(101, Some(9))
        .packet(0, 2_000_000, &frame)
        .packet(1, 1_500_000_000, &frame[14..])
        .finish();
    fs::write(&path, bytes).unwrap();

    let mut source = PcapFileSource::open(&path).unwrap();
    let mut seen = Vec::new();
    source
        .for_each_packet(|packet| {
            seen.push((packet.linktype, packet.ts.unwrap(), packet.len()));
            ControlFlow::Continue(())
        })
        .unwrap();

    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, Linktype::ETHERNET);
    assert!((seen[0].1 - 2.0).abs() < 1e-9);
    assert_eq!(seen[1].0, Linktype::RAW);
    assert!((seen[1].1 - 1.5).abs() < 1e-9);
    assert_eq!(seen[1].2, frame.len() - 14);
}

#[test]
fn header_only_capture_is_exhausted_immediately() {
    let temp = TempDir::new().unwrap();
    let path = fixture(&temp, "empty.pcap", &[]);

    let mut source = PcapFileSource::open(&path).unwrap();
    let (pass, frames) = collect(&mut source);

    assert_eq!(pass, Pass::Exhausted { packets: 0 });
    assert!(frames.is_empty());
}

#[test]
fn break_stops_mid_file() {
    let temp = TempDir::new().unwrap();
    let path = fixture(&temp, "input.pcap", &udp_sequence(8).unwrap());

    let mut source = PcapFileSource::open(&path).unwrap();
    let mut seen = 0;
    let pass = source
        .for_each_packet(|_| {
            seen += 1;
            if seen == 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();

    assert_eq!(pass, Pass::Stopped { packets: 3 });
}

#[test]
fn opener_reproduces_identical_sequence() {
    let temp = TempDir::new().unwrap();
    let packets = udp_sequence(4).unwrap();
    let path = fixture(&temp, "input.pcapng", &packets);
    let opener = PcapFileOpener::new(&path);

    let (_, first) = collect(&mut opener.open().unwrap());
    let (_, second) = collect(&mut opener.open().unwrap());

    assert_eq!(first, second);
    assert_eq!(opener.describe(), path.display().to_string());
}

#[test]
fn pcap_source_rejects_truncated_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("truncated.pcapng");
    fs::write(&path, [0x0a, 0x0d, 0x0d]).unwrap();

    let err = match PcapFileSource::open(&path) {
        Ok(_) => panic!("expected truncated file to be rejected"),
        Err(err) => err,
    };

    assert!(matches!(err, SourceError::Io(_)));
}

#[test]
fn pcap_source_rejects_non_capture_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("notes.pcap");
    fs::write(&path, [0xffu8; 64]).unwrap();

    let err = match PcapFileSource::open(&path) {
        Ok(_) => panic!("expected garbage to be rejected"),
        Err(err) => err,
    };

    assert!(matches!(err, SourceError::Pcap(_)));
}

#[test]
fn pcap_source_rejects_missing_file() {
    let err = match PcapFileSource::open(Path::new("/nonexistent/capture.pcap")) {
        Ok(_) => panic!("expected missing file to be rejected"),
        Err(err) => err,
    };
    assert!(matches!(err, SourceError::Io(_)));
}
