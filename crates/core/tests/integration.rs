//! Integration test: a sender streams frames over TCP to a running receiver.
//!
//! Binds to an ephemeral port, writes frames in awkward chunk sizes, then
//! polls the published status until every frame has been decoded.

use std::io::Write;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use mjpeg::media::jpeg::{DecodeError, JpegInfo, JpegProbe};
use mjpeg::media::{Decoder, Renderer, WaitingScreen};
use mjpeg::{Receiver, SessionState, StreamError};
use parking_lot::Mutex;

/// Probe decoder that also keeps a copy of every frame it sees.
#[derive(Clone, Default)]
struct SharedDecoder {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Decoder for SharedDecoder {
    type Output = JpegInfo;
    type Error = DecodeError;

    fn decode(&mut self, frame: &[u8]) -> Result<JpegInfo, DecodeError> {
        self.frames.lock().push(frame.to_vec());
        JpegProbe::probe(frame)
    }
}

#[derive(Clone, Default)]
struct SharedRenderer {
    rendered: Arc<Mutex<Vec<(u16, u16)>>>,
    waiting: Arc<Mutex<usize>>,
}

impl Renderer<JpegInfo> for SharedRenderer {
    fn render(&mut self, image: &JpegInfo) {
        self.rendered.lock().push((image.width, image.height));
    }

    fn show_waiting(&mut self, _screen: &WaitingScreen) {
        *self.waiting.lock() += 1;
    }
}

fn jpeg(width: u16, height: u16, fill: u8) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    out.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x0B, 0x08]);
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&[0x01, 0x01, 0x11, 0x00]);
    out.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]);
    out.extend(std::iter::repeat_n(fill, 64));
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

fn wait_until<F: FnMut() -> bool>(mut cond: F) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn streams_frames_and_returns_to_idle() {
    let decoder = SharedDecoder::default();
    let renderer = SharedRenderer::default();
    let mut receiver = Receiver::new("127.0.0.1:0");
    let addr = receiver
        .start(decoder.clone(), renderer.clone())
        .expect("receiver start");
    assert!(receiver.is_running());
    assert_eq!(*renderer.waiting.lock(), 1);

    let frames = [jpeg(280, 240, 0x11), jpeg(320, 240, 0x22), jpeg(16, 16, 0x33)];
    let mut stream = vec![0x00, 0x42];
    for frame in &frames {
        stream.extend_from_slice(frame);
    }

    let mut client = TcpStream::connect(addr).expect("connect to receiver");
    for chunk in stream.chunks(7) {
        client.write_all(chunk).unwrap();
        client.flush().unwrap();
    }

    assert!(
        wait_until(|| receiver.status().total_frames == 3),
        "expected 3 frames, status: {:?}",
        receiver.status()
    );
    let status = receiver.status();
    assert_eq!(status.state, SessionState::Streaming);
    assert!(status.peer_addr.is_some());
    assert_eq!(*decoder.frames.lock(), frames.to_vec());
    assert_eq!(
        *renderer.rendered.lock(),
        vec![(280, 240), (320, 240), (16, 16)]
    );

    drop(client);
    assert!(wait_until(|| receiver.status().state == SessionState::Idle));
    assert_eq!(*renderer.waiting.lock(), 2);

    receiver.stop().unwrap();
    assert!(!receiver.is_running());
}

#[test]
fn malformed_frame_does_not_end_session() {
    let decoder = SharedDecoder::default();
    let mut receiver = Receiver::new("127.0.0.1:0");
    let addr = receiver
        .start(decoder.clone(), SharedRenderer::default())
        .unwrap();

    let mut client = TcpStream::connect(addr).unwrap();
    client.write_all(&[0xFF, 0xD8, 0x01, 0x02, 0xFF, 0xD9]).unwrap();
    client.write_all(&jpeg(8, 8, 0x00)).unwrap();

    assert!(wait_until(|| receiver.status().total_frames == 1));
    assert_eq!(decoder.frames.lock().len(), 2);
    assert_eq!(receiver.status().state, SessionState::Streaming);

    receiver.stop().unwrap();
}

#[test]
fn second_start_is_rejected() {
    let mut receiver = Receiver::new("127.0.0.1:0");
    receiver
        .start(SharedDecoder::default(), SharedRenderer::default())
        .unwrap();
    let err = receiver
        .start(SharedDecoder::default(), SharedRenderer::default())
        .unwrap_err();
    assert!(matches!(err, StreamError::AlreadyRunning));
    receiver.stop().unwrap();
}

#[test]
fn stop_before_start_is_an_error() {
    let mut receiver = Receiver::new("127.0.0.1:0");
    assert!(matches!(receiver.stop(), Err(StreamError::NotStarted)));
}
