use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;
use nmeawave_core::{checksum, frame, ChecksumCase, ChunkMode, Pipeline, PipelineConfig, Sentence};
use proptest::prelude::*;

const GGA: &str = "GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";
const GSA: &str = "GPGSA,A,3,04,05,,09,12,,,24,,,,,2.5,1.3,2.1";

fn pipeline() -> (Pipeline, Receiver<Sentence>) {
    Pipeline::new(PipelineConfig::default())
}

fn drain(mut p: Pipeline, output: Receiver<Sentence>) -> Vec<Sentence> {
    p.close();
    output.iter().collect()
}

#[test]
fn reference_stream_submitted_twice() {
    let (mut p, output) = pipeline();
    let b = format!(
        "çsd+è${GGA}*47$GPGSA,A,3,04,05,,09,12*,,,24.1*39\r\nagafgsa$$$$$fgsfgafga${GSA}*39"
    );
    assert_eq!(p.submit(b.as_bytes()), 2);
    assert_eq!(p.submit(b.as_bytes()), 2);

    let kinds: Vec<String> = drain(p, output).into_iter().map(|s| s.kind).collect();
    assert_eq!(kinds, ["GGA", "GSA", "GGA", "GSA"]);
}

#[test]
fn back_to_back_frames_keep_source_order() {
    let (mut p, output) = pipeline();
    let input = format!("${GGA}*47${GSA}*39");
    assert_eq!(p.submit(input.as_bytes()), 2);

    let out = drain(p, output);
    assert_eq!(out[0].payload(), GGA);
    assert_eq!(out[1].payload(), GSA);
}

#[test]
fn restart_marker_discards_unterminated_frame() {
    let (mut p, output) = pipeline();
    let input = format!("$AAA$GPGGA,1,2,3*{}", checksum("GPGGA,1,2,3").to_uppercase());
    assert_eq!(p.submit(input.as_bytes()), 1);

    let out = drain(p, output);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].data, ["GPGGA", "1", "2", "3"]);
}

#[test]
fn invalid_header_still_flows_through() {
    let (mut p, output) = pipeline();
    p.submit(frame("PGGA,1,2").as_bytes());
    let out = drain(p, output);
    assert_eq!(out.len(), 1);
    assert!(!out[0].valid);
    assert!(out[0].kind.is_empty());
}

#[test]
fn carry_over_joins_chunks() {
    let (mut p, output) = Pipeline::new(PipelineConfig {
        chunk_mode: ChunkMode::CarryOver,
        ..Default::default()
    });
    let f = frame(GGA);
    let (a, b) = f.as_bytes().split_at(20);
    assert_eq!(p.submit(a), 0);
    assert_eq!(p.submit(b), 1);
    assert_eq!(drain(p, output)[0].kind, "GGA");
}

#[test]
fn reset_per_chunk_drops_split_frames() {
    let (mut p, output) = pipeline();
    let f = frame(GGA);
    let (a, b) = f.as_bytes().split_at(20);
    assert_eq!(p.submit(a), 0);
    assert_eq!(p.submit(b), 0);
    assert!(drain(p, output).is_empty());
}

#[test]
fn insensitive_case_accepts_lowercase_digits() {
    let payload = "GPGLL,1,N"; // digest 2f
    let lower = format!("${payload}*2f");

    let (mut strict, _strict_output) = pipeline();
    assert_eq!(strict.submit(lower.as_bytes()), 0);

    let (mut relaxed, _relaxed_output) = Pipeline::new(PipelineConfig {
        checksum_case: ChecksumCase::Insensitive,
        ..Default::default()
    });
    assert_eq!(relaxed.submit(lower.as_bytes()), 1);
}

#[test]
fn backpressure_loses_nothing() {
    // Far more frames than both queues together can hold.
    const FRAMES: usize = 1000;
    let (mut p, output) = Pipeline::new(PipelineConfig {
        raw_capacity: 4,
        output_capacity: 4,
        ..Default::default()
    });

    let consumer = thread::spawn(move || {
        let mut seen = Vec::new();
        for s in output.iter() {
            seen.push(s.data[1].clone());
            if seen.len() % 100 == 0 {
                thread::sleep(Duration::from_millis(1));
            }
        }
        seen
    });

    let mut total = 0;
    for i in 0..FRAMES {
        total += p.submit(frame(&format!("GPZDA,{i}")).as_bytes());
    }
    assert_eq!(total, FRAMES as u64);
    p.close();
    drop(p);

    let seen = consumer.join().unwrap();
    let expected: Vec<String> = (0..FRAMES).map(|i| i.to_string()).collect();
    assert_eq!(seen, expected);
}

#[test]
fn unread_output_does_not_block_drop() {
    let (mut p, _output) = Pipeline::new(PipelineConfig {
        raw_capacity: 1,
        output_capacity: 1,
        ..Default::default()
    });
    // decode thread holds one, output holds one, raw holds one
    for _ in 0..3 {
        p.submit(frame("GPGLL,1,N").as_bytes());
    }
    drop(p);
}

#[test]
fn submit_reader_treats_input_as_one_chunk() {
    let (mut p, output) = pipeline();
    let data = format!("{}\n{}\n$GPGGA", frame(GGA), frame(GSA));
    assert_eq!(p.submit_reader(data.as_bytes()).unwrap(), 2);
    assert_eq!(p.stats().discarded, 1);
    assert_eq!(drain(p, output).len(), 2);
}

fn payload() -> impl Strategy<Value = String> {
    "[^$*]{0,80}"
}

proptest! {
    #[test]
    fn no_start_marker_no_frames(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let bytes: Vec<u8> = bytes.into_iter().filter(|&b| b != b'$').collect();
        let (mut p, output) = pipeline();
        prop_assert_eq!(p.submit(&bytes), 0);
        prop_assert!(drain(p, output).is_empty());
    }

    #[test]
    fn own_checksum_always_validates(p in payload()) {
        let (mut pipeline, output) = pipeline();
        let input = format!("${p}*{}", checksum(&p).to_uppercase());
        prop_assert_eq!(pipeline.submit(input.as_bytes()), 1);

        let out = drain(pipeline, output);
        let fields: Vec<&str> = p.split(',').collect();
        prop_assert_eq!(out.len(), 1);
        prop_assert_eq!(&out[0].data, &fields);
    }

    #[test]
    fn wrong_checksum_never_validates(p in payload(), delta in 1u8..=255) {
        let good = u8::from_str_radix(&checksum(&p), 16).unwrap();
        let bad = format!("{:02X}", good ^ delta);
        let (mut pipeline, output) = pipeline();
        let input = format!("${p}*{bad}");
        prop_assert_eq!(pipeline.submit(input.as_bytes()), 0);
        prop_assert!(drain(pipeline, output).is_empty());
    }
}
