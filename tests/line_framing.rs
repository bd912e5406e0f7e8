use harvest_station_lib::serial::LineFramer;

const STREAM: &[u8] = b"12.5 g\r\n\r\n  13.0 g \r\nPLANT-\xff01\r\npartial";

fn frame_in_chunks(stream: &[u8], size: usize) -> (Vec<String>, Vec<u8>) {
    let mut framer = LineFramer::new();
    let mut lines = Vec::new();
    for chunk in stream.chunks(size) {
        lines.extend(framer.push(chunk));
    }
    (lines, framer.pending().to_vec())
}

#[test]
fn chunk_size_does_not_change_lines() {
    let (whole, whole_pending) = frame_in_chunks(STREAM, STREAM.len());
    assert_eq!(whole, vec!["12.5 g", "13.0 g", "PLANT-\u{fffd}01"]);
    assert_eq!(whole_pending, b"partial");

    for size in 1..STREAM.len() {
        let (lines, pending) = frame_in_chunks(STREAM, size);
        assert_eq!(lines, whole, "chunk size {}", size);
        assert_eq!(pending, whole_pending, "chunk size {}", size);
    }
}

#[test]
fn trailing_partial_line_is_held_back() {
    let mut framer = LineFramer::new();
    assert!(framer.push(b"45 g").is_empty());
    assert!(framer.push(b"\r").is_empty());
    assert_eq!(framer.push(b"\n"), vec!["45 g"]);
    assert!(framer.pending().is_empty());
}

#[test]
fn empty_chunks_are_no_ops() {
    let mut framer = LineFramer::new();
    assert!(framer.push(b"").is_empty());
    assert!(framer.push(b"\r\n\r\n").is_empty());
    assert!(framer.pending().is_empty());
}
