//! Tests of the stream engine against a recording session.

use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;

use h2stream::noop;
use h2stream::CloseEvent;
use h2stream::CloseState;
use h2stream::DataFrame;
use h2stream::EndStream;
use h2stream::Error;
use h2stream::ErrorCode;
use h2stream::Header;
use h2stream::Headers;
use h2stream::HeadersFrame;
use h2stream::HeadersPlace;
use h2stream::PriorityFrame;
use h2stream::PushPromiseFrame;
use h2stream::RstStreamFrame;
use h2stream::StreamFrame;

use h2stream_test::*;

fn response_headers_frame(end_stream: bool) -> HeadersFrame {
    HeadersFrame::new(
        TEST_STREAM_ID,
        Headers::ok_200(),
        HeadersPlace::Initial,
        EndStream::from_bool(end_stream),
    )
}

fn headers_with_content_length(len: u32) -> Headers {
    let mut headers = Headers::ok_200();
    headers.add_header(Header::new("content-length", len.to_string().into_bytes()));
    headers
}

#[test]
fn preface_notifies_new_stream() {
    init_logger();

    let harness = StreamHarness::new();
    let listener = RecordingListener::manual_demand();
    harness.stream.set_listener(listener.clone());

    let callback = harness.recv_preface();

    assert!(callback.succeeded());
    assert_eq!(1, listener.new_streams.load(Ordering::SeqCst));
}

#[test]
fn headers_end_stream_half_closes_remote() {
    init_logger();

    let harness = StreamHarness::new();

    let callback = harness.recv_headers(Headers::ok_200(), true);

    assert!(callback.succeeded());
    assert_eq!(CloseState::RemotelyClosed, harness.stream.close_state());
    assert!(harness.stream.is_remotely_closed());
    // The local side is still open: no removal yet.
    assert!(harness.session.removed().is_empty());
}

#[test]
fn data_stalls_until_demand() {
    init_logger();

    let harness = StreamHarness::new();
    let listener = RecordingListener::manual_demand();
    harness.stream.set_listener(listener.clone());

    let first = harness.recv_data(b"one", false);
    let second = harness.recv_data(b"two", false);

    assert_eq!(1, listener.before_data.load(Ordering::SeqCst));
    assert_eq!(0, listener.delivered_count());
    assert!(first.pending());
    assert!(second.pending());

    harness.stream.demand(1);
    assert_eq!(vec![Bytes::from("one")], listener.delivered_payloads());
    assert!(first.succeeded());
    assert!(second.pending());

    harness.stream.demand(1);
    assert_eq!(2, listener.delivered_count());
    assert!(second.succeeded());
}

#[test]
fn data_delivery_is_fifo() {
    init_logger();

    let harness = StreamHarness::new();
    let listener = RecordingListener::manual_demand();
    harness.stream.set_listener(listener.clone());

    harness.recv_data(b"a", false);
    harness.recv_data(b"b", false);
    harness.recv_data(b"c", false);
    harness.stream.demand(3);

    assert_eq!(
        vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("c")],
        listener.delivered_payloads()
    );
}

#[test]
fn delivered_never_exceeds_demand() {
    init_logger();

    let harness = StreamHarness::new();
    let listener = RecordingListener::manual_demand();
    harness.stream.set_listener(listener.clone());

    for tag in 0..5u8 {
        harness.recv_data(&[tag], false);
    }

    harness.stream.demand(2);
    assert_eq!(2, listener.delivered_count());

    harness.stream.demand(1);
    assert_eq!(3, listener.delivered_count());
}

#[test]
fn no_listener_consumes_and_closes_at_final_frame() {
    init_logger();

    let harness = StreamHarness::new();

    for tag in 0..3u8 {
        let callback = harness.recv_data(&[tag], false);
        assert!(callback.succeeded());
        assert_eq!(CloseState::NotClosed, harness.stream.close_state());
    }

    let last = harness.recv_data(b"", true);
    assert!(last.succeeded());
    assert_eq!(CloseState::RemotelyClosed, harness.stream.close_state());
    assert!(harness.session.removed().is_empty());
}

#[test]
fn no_listener_fully_closes_after_local_close() {
    init_logger();

    let harness = StreamHarness::new();

    // The session closed the local side first (response fully sent).
    assert!(!harness.stream.update_close(true, CloseEvent::BeforeSend));
    assert!(!harness.stream.update_close(true, CloseEvent::AfterSend));
    assert_eq!(CloseState::LocallyClosed, harness.stream.close_state());

    let callback = harness.recv_data(b"fin", true);

    assert!(callback.succeeded());
    assert!(harness.stream.is_closed());
    assert_eq!(vec![TEST_STREAM_ID], harness.session.removed());
    assert_eq!(vec![(false, -1, 0)], harness.session.stream_counts());
}

#[test]
fn close_handshake_remote_then_local() {
    init_logger();

    let harness = StreamHarness::new();
    let listener = RecordingListener::manual_demand();
    harness.stream.set_listener(listener.clone());

    assert!(harness.recv_headers(Headers::ok_200(), true).succeeded());
    assert_eq!(CloseState::RemotelyClosed, harness.stream.close_state());

    // Session side: queue, then flush, the local END_STREAM.
    assert!(!harness.stream.update_close(true, CloseEvent::BeforeSend));
    assert_eq!(CloseState::Closing, harness.stream.close_state());
    assert!(harness.stream.update_close(true, CloseEvent::AfterSend));

    assert!(harness.stream.is_closed());
    assert_eq!(1, listener.closed.load(Ordering::SeqCst));
    assert_eq!(
        vec![(false, 0, 1), (false, -1, -1)],
        harness.session.stream_counts()
    );
}

#[test]
fn close_is_idempotent() {
    init_logger();

    let harness = StreamHarness::new();
    let listener = RecordingListener::manual_demand();
    harness.stream.set_listener(listener.clone());

    harness.stream.close();
    harness.stream.close();

    assert_eq!(1, listener.closed.load(Ordering::SeqCst));
    assert_eq!(vec![(false, -1, 0)], harness.session.stream_counts());
}

#[test]
fn concurrent_close_has_single_winner() {
    init_logger();

    let harness = StreamHarness::new();
    let listener = RecordingListener::manual_demand();
    harness.stream.set_listener(listener.clone());

    let a = harness.stream.clone();
    let b = harness.stream.clone();
    let ta = thread::spawn(move || a.close());
    let tb = thread::spawn(move || b.close());
    ta.join().unwrap();
    tb.join().unwrap();

    assert_eq!(1, listener.closed.load(Ordering::SeqCst));
    assert_eq!(1, harness.session.stream_counts().len());
}

#[test]
fn fail_fails_backlog_in_order_and_rejects_future_frames() {
    init_logger();

    let harness = StreamHarness::new();
    let listener = RecordingListener::manual_demand();
    harness.stream.set_listener(listener.clone());

    let first = harness.recv_data(b"one", false);
    let second = harness.recv_data(b"two", false);

    harness
        .stream
        .fail(Error::RstStreamReceived(ErrorCode::Cancel));

    let failed_with_cancel = |callback: &CallbackState| {
        callback.failed_with(|e| match e {
            Error::StreamFailed(inner) => {
                matches!(**inner, Error::RstStreamReceived(ErrorCode::Cancel))
            }
            _ => false,
        })
    };
    assert!(failed_with_cancel(&first));
    assert!(failed_with_cancel(&second));

    // Failure is an overlay: the close handshake state is untouched.
    assert_eq!(CloseState::NotClosed, harness.stream.close_state());

    let third = harness.recv_data(b"three", false);
    assert!(failed_with_cancel(&third));
    assert_eq!(0, listener.delivered_count());

    // Demand against a failed stream is a silent no-op.
    harness.stream.demand(1);
    assert_eq!(0, listener.delivered_count());
}

#[test]
fn headers_write_completes_through_the_session() {
    init_logger();

    let harness = StreamHarness::new();

    let callback = CallbackState::new();
    harness
        .stream
        .headers(response_headers_frame(false), callback.callback());

    assert!(callback.pending());
    match &harness.session.sent_frames()[..] {
        [StreamFrame::Headers(frame)] => assert_eq!(Headers::ok_200(), frame.headers),
        other => panic!("expected one HEADERS frame, got {:?}", other),
    }

    harness.session.complete_next_write(Ok(()));
    assert!(callback.succeeded());
}

#[test]
fn write_failure_reaches_the_caller() {
    init_logger();

    let harness = StreamHarness::new();

    let callback = CallbackState::new();
    harness
        .stream
        .headers(response_headers_frame(false), callback.callback());
    harness
        .session
        .complete_next_write(Err(Error::IoError(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "pipe",
        ))));

    assert!(callback.failed_with(|e| matches!(e, Error::IoError(_))));
}

#[test]
fn second_write_fails_with_write_pending_and_closes() {
    init_logger();

    let harness = StreamHarness::new();
    let listener = RecordingListener::manual_demand();
    harness.stream.set_listener(listener.clone());

    let first = CallbackState::new();
    harness
        .stream
        .headers(response_headers_frame(false), first.callback());

    let second = CallbackState::new();
    let frame = DataFrame::new(TEST_STREAM_ID, Bytes::from("body"), EndStream::No);
    harness.stream.data(frame, second.callback());

    assert!(second.failed_with(|e| matches!(e, Error::WritePending(1))));
    assert!(harness.stream.is_closed());
    assert_eq!(1, listener.closed.load(Ordering::SeqCst));
    // The conflicting DATA never reached the session.
    assert!(harness.session.sent_data().is_empty());

    // The outstanding write still completes normally.
    harness.session.complete_next_write(Ok(()));
    assert!(first.succeeded());
}

#[test]
fn reset_bypasses_the_write_slot() {
    init_logger();

    let harness = StreamHarness::new();

    let write = CallbackState::new();
    harness
        .stream
        .headers(response_headers_frame(true), write.callback());

    let reset = CallbackState::new();
    harness.stream.reset(
        RstStreamFrame::new(TEST_STREAM_ID, ErrorCode::Cancel),
        reset.callback(),
    );

    assert!(harness.stream.is_reset());
    assert_eq!(1, harness.session.sent_resets().len());
    assert_eq!(2, harness.session.pending_writes());

    harness.session.complete_next_write(Ok(()));
    assert!(write.succeeded());
    harness.session.complete_next_write(Ok(()));
    assert!(reset.succeeded());
}

#[test]
fn duplicate_reset_is_a_noop() {
    init_logger();

    let harness = StreamHarness::new();

    let first = CallbackState::new();
    harness.stream.reset(
        RstStreamFrame::new(TEST_STREAM_ID, ErrorCode::Cancel),
        first.callback(),
    );
    let second = CallbackState::new();
    harness.stream.reset(
        RstStreamFrame::new(TEST_STREAM_ID, ErrorCode::ProtocolError),
        second.callback(),
    );

    assert_eq!(1, harness.session.sent_resets().len());
    assert_eq!(ErrorCode::Cancel, harness.session.sent_resets()[0].error_code());
    // The duplicate is dropped without completing its callback.
    assert_eq!(0, second.completions());
}

#[test]
fn data_after_remote_close_answers_with_stream_closed() {
    init_logger();

    let harness = StreamHarness::new();

    assert!(harness.recv_headers(Headers::ok_200(), true).succeeded());
    let callback = harness.recv_data(b"late", false);

    assert!(callback.failed_with(|e| matches!(e, Error::DataOnClosedStream(1))));
    let resets = harness.session.sent_resets();
    assert_eq!(1, resets.len());
    assert_eq!(ErrorCode::StreamClosed, resets[0].error_code());
    // Reset was sent, but the close handshake state is unchanged.
    assert_eq!(CloseState::RemotelyClosed, harness.stream.close_state());
    assert!(harness.stream.is_reset());
}

#[test]
fn data_on_reset_stream_is_dropped_without_answer() {
    init_logger();

    let harness = StreamHarness::new();

    harness.stream.reset(
        RstStreamFrame::new(TEST_STREAM_ID, ErrorCode::Cancel),
        noop(),
    );
    let callback = harness.recv_data(b"late", false);

    assert!(callback.failed_with(|e| matches!(e, Error::StreamReset(1))));
    // No answering reset: one frame total, no storm.
    assert_eq!(1, harness.session.sent_resets().len());
}

#[test]
fn content_length_mismatch_resets_with_protocol_error() {
    init_logger();

    let harness = StreamHarness::new();

    assert!(harness
        .recv_headers(headers_with_content_length(5), false)
        .succeeded());
    let callback = harness.recv_data(b"abc", true);

    assert!(callback.failed_with(|e| matches!(e, Error::InvalidDataLength(1))));
    let resets = harness.session.sent_resets();
    assert_eq!(1, resets.len());
    assert_eq!(ErrorCode::ProtocolError, resets[0].error_code());
}

#[test]
fn content_length_exact_is_accepted() {
    init_logger();

    let harness = StreamHarness::new();

    assert!(harness
        .recv_headers(headers_with_content_length(5), false)
        .succeeded());
    assert!(harness.recv_data(b"ab", false).succeeded());
    assert!(harness.recv_data(b"cde", true).succeeded());

    assert!(harness.session.sent_resets().is_empty());
    assert_eq!(CloseState::RemotelyClosed, harness.stream.close_state());
}

#[test]
fn content_length_overrun_is_detected_at_end_stream() {
    init_logger();

    let harness = StreamHarness::new();

    assert!(harness
        .recv_headers(headers_with_content_length(3), false)
        .succeeded());
    // Too long already, but the check only runs on the final frame.
    assert!(harness.recv_data(b"abcde", false).succeeded());

    let last = harness.recv_data(b"", true);
    assert!(last.failed_with(|e| matches!(e, Error::InvalidDataLength(1))));
    assert_eq!(
        ErrorCode::ProtocolError,
        harness.session.sent_resets()[0].error_code()
    );
}

#[test]
fn connect_request_is_exempt_from_content_length() {
    init_logger();

    let request = Headers::from_vec(vec![
        Header::new(":method", "CONNECT"),
        Header::new(":authority", "example.com:443"),
    ]);
    let harness = StreamHarness::with_request(request);

    assert!(harness
        .recv_headers(headers_with_content_length(5), false)
        .succeeded());
    // Tunnelled bytes are not measured against content-length.
    assert!(harness.recv_data(b"xx", true).succeeded());
    assert!(harness.session.sent_resets().is_empty());
}

#[test]
fn trailers_end_the_stream_without_touching_content_length() {
    init_logger();

    let harness = StreamHarness::new();

    assert!(harness
        .recv_headers(headers_with_content_length(3), false)
        .succeeded());
    assert!(harness.recv_data(b"abc", false).succeeded());

    let mut trailers = Headers::new();
    trailers.add("x-checksum", "0");
    assert!(harness.recv_trailers(trailers).succeeded());

    assert!(harness.session.sent_resets().is_empty());
    assert_eq!(CloseState::RemotelyClosed, harness.stream.close_state());
}

#[test]
fn window_overrun_escalates_to_connection_failure() {
    init_logger();

    let harness = StreamHarness::new();
    let listener = RecordingListener::manual_demand();
    harness.stream.set_listener(listener.clone());

    let payload = vec![0u8; 70_000];
    let callback = harness.recv_data(&payload, false);

    assert!(callback.failed_with(|e| matches!(e, Error::StreamWindowExceeded(1))));
    assert_eq!(
        vec![(
            ErrorCode::FlowControlError,
            "stream_window_exceeded".to_owned()
        )],
        harness.session.connection_failures()
    );
    // Connection-level failure, not a stream reset.
    assert!(harness.session.sent_resets().is_empty());
    assert_eq!(0, listener.delivered_count());
}

#[test]
fn rst_stream_received_closes_and_removes() {
    init_logger();

    let harness = StreamHarness::new();
    let listener = RecordingListener::manual_demand();
    harness.stream.set_listener(listener.clone());

    let callback = harness.recv_rst(ErrorCode::Cancel);

    assert!(callback.succeeded());
    assert!(harness.stream.is_closed());
    assert!(harness.stream.is_reset());
    assert_eq!(vec![TEST_STREAM_ID], harness.session.removed());
    assert_eq!(1, listener.closed.load(Ordering::SeqCst));
    let resets = listener.resets.lock().unwrap();
    assert_eq!(1, resets.len());
    assert_eq!(ErrorCode::Cancel, resets[0].error_code());
}

#[test]
fn push_promise_makes_the_stream_locally_closed() {
    init_logger();

    let harness = StreamHarness::new();

    let callback = harness.recv_push_promise(3, Headers::new_get("/style.css"));

    assert!(callback.succeeded());
    assert_eq!(CloseState::LocallyClosed, harness.stream.close_state());

    // The pushed response body fully closes the stream.
    assert!(harness.recv_data(b"css", true).succeeded());
    assert!(harness.stream.is_closed());
    assert_eq!(vec![TEST_STREAM_ID], harness.session.removed());
}

#[test]
fn push_is_forwarded_to_the_session() {
    init_logger();

    let harness = StreamHarness::new();

    let frame = PushPromiseFrame::new(TEST_STREAM_ID, 2, Headers::new_get("/style.css"));
    let promise = Box::new(|_: h2stream::Result<Arc<h2stream::H2Stream>>| {});
    harness
        .stream
        .push(frame.clone(), promise, RecordingListener::manual_demand());

    assert_eq!(vec![frame], harness.session.pushes());
}

#[test]
fn window_update_completes_its_callback() {
    init_logger();

    let harness = StreamHarness::new();

    let callback = harness.recv_window_update(1000);

    assert!(callback.succeeded());
    assert_eq!(65_535 + 1000, harness.stream.send_window());
}

#[test]
fn failure_frame_reaches_the_listener() {
    init_logger();

    let harness = StreamHarness::new();
    let listener = RecordingListener::manual_demand();
    harness.stream.set_listener(listener.clone());

    let callback = harness.recv_failure(ErrorCode::ProtocolError, "connection torn down");

    assert!(callback.succeeded());
    assert_eq!(
        vec![(ErrorCode::ProtocolError, "connection torn down".to_owned())],
        listener.failures.lock().unwrap().clone()
    );
}

#[test]
fn failure_frame_without_listener_succeeds_the_callback() {
    init_logger();

    let harness = StreamHarness::new();

    assert!(harness
        .recv_failure(ErrorCode::InternalError, "io error")
        .succeeded());
}

#[test]
#[should_panic(expected = "PRIORITY")]
fn priority_frame_is_rejected_at_dispatch() {
    init_logger();

    let harness = StreamHarness::new();
    harness.stream.process(
        StreamFrame::Priority(PriorityFrame::new(TEST_STREAM_ID, false, 0, 16)),
        noop(),
    );
}

#[test]
#[should_panic(expected = "invalid demand")]
fn demand_zero_panics() {
    init_logger();

    let harness = StreamHarness::new();
    harness.stream.demand(0);
}

#[test]
fn listener_panic_fails_the_callback_and_the_stream_survives() {
    init_logger();

    let harness = StreamHarness::new();
    harness.stream.set_listener(Arc::new(PanickingListener));

    // Default before-data demand is one, so the first frame is delivered
    // to the panicking listener right away.
    let first = harness.recv_data(b"x", false);
    assert!(first.failed_with(|e| matches!(e, Error::HandlerPanicked(m) if m == "listener bug")));
    assert!(harness.stream.is_open());
    assert!(harness.session.sent_resets().is_empty());

    // The engine keeps dispatching.
    let second = harness.recv_data(b"y", false);
    assert!(second.pending());
    harness.stream.demand(1);
    assert!(second.failed_with(|e| matches!(e, Error::HandlerPanicked(_))));
}

#[test]
fn concurrent_demand_and_arrival_is_fifo_and_exclusive() {
    init_logger();

    let harness = StreamHarness::new();
    let listener = RecordingListener::manual_demand();
    harness.stream.set_listener(listener.clone());

    const FRAMES: usize = 100;

    let demander = {
        let stream = harness.stream.clone();
        thread::spawn(move || {
            for _ in 0..FRAMES {
                stream.demand(1);
                thread::sleep(Duration::from_micros(50));
            }
        })
    };
    for tag in 0..FRAMES {
        harness.recv_data(&[tag as u8], false);
        thread::sleep(Duration::from_micros(30));
    }
    demander.join().unwrap();

    assert!(wait_for(Duration::from_secs(5), || listener.delivered_count()
        == FRAMES));
    let tags: Vec<u8> = listener
        .delivered_payloads()
        .iter()
        .map(|data| data[0])
        .collect();
    let expected: Vec<u8> = (0..FRAMES as u8).collect();
    assert_eq!(expected, tags);
    assert_eq!(0, listener.overlapping_deliveries.load(Ordering::SeqCst));
}

#[test]
fn attachment_and_attributes_round_trip() {
    init_logger();

    let harness = StreamHarness::new();
    let stream = &harness.stream;

    assert!(stream.attachment().is_none());
    stream.set_attachment(Some(Arc::new(42u32)));
    assert_eq!(
        Some(&42u32),
        stream.attachment().as_deref().and_then(|a| a.downcast_ref())
    );
    stream.set_attachment(None);
    assert!(stream.attachment().is_none());

    assert!(stream.attribute("peer").is_none());
    stream.set_attribute("peer", Arc::new("them".to_owned()));
    assert!(stream.attribute("peer").is_some());
    assert!(stream.remove_attribute("peer").is_some());
    assert!(stream.attribute("peer").is_none());
}

#[test]
fn debug_format_is_one_line_of_state() {
    init_logger();

    let harness = StreamHarness::new();
    let debug = format!("{:?}", harness.stream);

    assert!(debug.starts_with("H2Stream#1{"), "{}", debug);
    assert!(debug.contains("send_window=65535"), "{}", debug);
    assert!(debug.contains("NotClosed"), "{}", debug);
}
