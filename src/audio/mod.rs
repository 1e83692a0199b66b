pub mod wav;

pub use wav::{
    build_container, extract_frames, parse_header, CodecError, SampleEncoding, SamplePayload,
    WavFormat, WavHeader,
};
