#![no_main]

use bsl_net::core::codec::FrameCodec;
use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::{Decoder, Encoder};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must decode to frames or a clean error, never a panic
    let mut codec = FrameCodec::<u32>::with_max_frame_size(64 * 1024);
    let mut buf = BytesMut::from(data);

    while let Ok(Some(msg)) = codec.decode(&mut buf) {
        let mut out = BytesMut::new();
        if codec.encode(&msg, &mut out).is_ok() {
            let again = codec.decode(&mut out);
            assert!(matches!(again, Ok(Some(ref m)) if *m == msg));
        }
    }
});
