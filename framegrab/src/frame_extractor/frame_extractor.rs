extern crate ffmpeg_next as ffmpeg;

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use super::logger::{self, fault, verbose, warning};

use color_eyre::eyre::{self, Context};
use ffmpeg::codec::Context as CodecContext;
use ffmpeg::decoder::Video as DecoderVideo;
use ffmpeg::format::context::Input as FormatContext;
use ffmpeg::format::{input_with_dictionary, Pixel};
use ffmpeg::frame::Video as FrameVideo;
use ffmpeg::media::Type;
use ffmpeg::software::scaling::context::Context as ScalingContext;
use ffmpeg::util::log as ffmpeglog;
use ffmpeg::{Dictionary, Packet as CodecPacket, Rational};
use ffmpeg_sys_next::{AV_NOPTS_VALUE, AV_TIME_BASE};
use image::RgbImage;

static FFMPEG_INITIALIZED: OnceLock<Result<(), ffmpeg::Error>> = OnceLock::new();

/// Decodes the frames of a video, by index, in decode order.
///
/// Frames are decoded sequentially and the ones before the requested index are
/// discarded without being converted, so asking for increasing indices is cheap. Asking
/// for an index that has already been passed rewinds to the start of the video.
pub struct FrameExtractor<L: logger::Logger = logger::LogLogger> {
    logger: L,

    // ffmpeg contexts
    ictx: FormatContext,
    decoder: DecoderVideo,
    converter: ScalingContext,

    // decode position
    next_index: u64,
    drained: bool,

    // constants/metadata
    first_timestamp: i64,
    timebase: Rational,
    video_stream_index: usize,
    frame_rate: f64,
    frame_count: i64,
}

impl FrameExtractor<logger::LogLogger> {
    pub fn new<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        Self::new_with_logger(path, logger::LogLogger)
    }
}

impl<L> FrameExtractor<L>
where
    L: logger::Logger,
{
    pub fn new_with_logger(path: impl AsRef<Path>, logger: L) -> eyre::Result<Self> {
        if let Err(e) = FFMPEG_INITIALIZED.get_or_init(|| {
            ffmpeg::init()?;
            ffmpeglog::set_level(ffmpeglog::Level::Error);
            Ok(())
        }) {
            return Err(*e).wrap_err("Failed to initialize ffmpeg");
        }

        let options = {
            let mut options = Dictionary::new();
            options.set("analyzeduration", "10M");
            options.set("probesize", "5M"); // this is the default
            options
        };
        let mut ictx = input_with_dictionary(path.as_ref(), options)
            .wrap_err("Failed to open the file")?;

        let video = ictx
            .streams()
            .best(Type::Video)
            .ok_or(eyre::eyre!("No video stream"))?;

        let video_stream_index = video.index();
        let timebase = video.time_base();
        let first_timestamp = if video.start_time() == AV_NOPTS_VALUE {
            warning!(logger, "The video stream has no start time, assuming zero");
            0
        } else {
            video.start_time()
        };

        let frame_rate = stream_frame_rate(&video);
        let frame_count = stream_frame_count(&video, ictx.duration(), frame_rate);
        verbose!(
            logger,
            "Frame rate {:.3}, {} frames, stream {}",
            frame_rate,
            frame_count,
            video_stream_index
        );

        let decoder = CodecContext::from_parameters(video.parameters())
            .wrap_err("No codec found")?
            .decoder()
            .video()
            .wrap_err("No codec found, of type video (?)")?;

        let converter = Self::pixel_converter(&decoder)?;

        ictx.streams_mut()
            .filter(|stream| stream.index() != video_stream_index)
            .for_each(|mut stream| stream_set_discard_all(&mut stream));

        Ok(Self {
            logger,
            ictx,
            decoder,
            converter,
            next_index: 0,
            drained: false,
            first_timestamp,
            timebase,
            video_stream_index,
            frame_rate,
            frame_count,
        })
    }

    fn pixel_converter(decoder: &DecoderVideo) -> eyre::Result<ScalingContext> {
        eyre::ensure!(decoder.format() != Pixel::None, "No pixel format");
        Ok(ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            // http://git.videolan.org/?p=ffmpeg.git;a=blob;f=libavutil/pixfmt.h;hb=HEAD
            Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::Flags::FAST_BILINEAR,
        )?)
    }

    /// Frames per second, 0 if the container doesn't say.
    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// The number of frames as recorded by the container, or estimated from the duration
    /// if it isn't recorded. 0 if neither is known.
    pub fn frame_count(&self) -> i64 {
        self.frame_count
    }

    /// Decodes and returns the frame at `index`.
    pub fn frame_at(&mut self, index: u64) -> eyre::Result<RgbImage> {
        if index < self.next_index {
            verbose!(
                self.logger,
                "Rewinding from frame {} to reach frame {}",
                self.next_index,
                index
            );
            self.rewind().wrap_err("Failed to rewind")?;
        }

        loop {
            let frame = self
                .decode_next()
                .wrap_err_with(|| format!("Failed to decode up to frame {index}"))?
                .ok_or_else(|| {
                    eyre::eyre!(
                        "Frame {index} is past the end, the video ended after {} frames",
                        self.next_index
                    )
                })?;

            let current = self.next_index;
            self.next_index += 1;
            if current == index {
                return self
                    .convert(&frame)
                    .wrap_err_with(|| format!("Failed to convert frame {index}"));
            }
        }
    }

    fn convert(&mut self, frame: &FrameVideo) -> eyre::Result<RgbImage> {
        let mut converted = FrameVideo::empty();
        self.converter
            .run(frame, &mut converted)
            .wrap_err("Failed to convert the decoded frame")?;
        create_rust_image(converted)
    }

    /// The next frame in decode order, `None` at the end of the stream.
    fn decode_next(&mut self) -> eyre::Result<Option<FrameVideo>> {
        if self.drained {
            return Ok(None);
        }

        loop {
            let mut frame = FrameVideo::empty();
            // avcodec_receive_frame
            // https://ffmpeg.org/doxygen/trunk/group__lavc__decoding.html#ga11e6542c4e66d3028668788a1a74217c
            match self.decoder.receive_frame(&mut frame) {
                Ok(()) => return Ok(Some(frame)),
                Err(ffmpeg::Error::Other {
                    errno: libc::EAGAIN,
                }) => (),
                // End of stream situations.
                // https://ffmpeg.org/doxygen/trunk/avcodec_8h_source.html
                Err(ffmpeg::Error::Eof) => {
                    self.drained = true;
                    return Ok(None);
                }
                Err(e) => {
                    return Err(e).wrap_err("Decoder error when receiving a frame");
                }
            }

            self.feed_decoder()?;
        }
    }

    /// Sends the next packet of the video stream to the decoder, or EOF if there are none
    /// left.
    fn feed_decoder(&mut self) -> eyre::Result<()> {
        loop {
            // http://ffmpeg.org/doxygen/trunk/group__lavf__decoding.html#ga4fdb3084415a82e3810de6ee60e46a61
            let mut packet = CodecPacket::empty();
            match packet.read(&mut self.ictx) {
                Ok(()) if packet.stream() == self.video_stream_index => {
                    match self.decoder.send_packet(&packet) {
                        Ok(()) => return Ok(()),
                        Err(e) => {
                            fault!(self.logger, "Failed to decode a packet: {}", e);
                            continue;
                        }
                    }
                }
                Ok(()) => continue,
                Err(ffmpeg::Error::Eof) => {
                    return self
                        .decoder
                        .send_eof()
                        .wrap_err("Failed to send EOF to the decoder");
                }
                Err(e) => {
                    eyre::bail!("Failed to read a packet from the stream: {e}");
                }
            }
        }
    }

    fn rewind(&mut self) -> eyre::Result<()> {
        seek(
            &mut self.ictx,
            self.video_stream_index,
            self.first_timestamp,
            ..,
        )
        .wrap_err_with(|| {
            format!("Failed to seek to the beginning at {}", self.first_timestamp)
        })?;
        self.decoder.flush();
        self.next_index = 0;
        self.drained = false;
        Ok(())
    }
}

fn usable_rate(rate: Rational) -> Option<f64> {
    (rate.numerator() > 0 && rate.denominator() > 0).then(|| f64::from(rate))
}

fn stream_frame_rate(video: &ffmpeg::Stream) -> f64 {
    usable_rate(video.avg_frame_rate())
        .or_else(|| usable_rate(video.rate()))
        .unwrap_or(0.0)
}

fn stream_frame_count(
    video: &ffmpeg::Stream,
    container_duration: i64,
    frame_rate: f64,
) -> i64 {
    if video.frames() > 0 {
        return video.frames();
    }

    let seconds = match usable_rate(video.time_base()) {
        Some(timebase) if video.duration() != AV_NOPTS_VALUE && video.duration() > 0 => {
            video.duration() as f64 * timebase
        }
        _ if container_duration != AV_NOPTS_VALUE && container_duration > 0 => {
            container_duration as f64 / f64::from(AV_TIME_BASE)
        }
        _ => return 0,
    };

    (seconds * frame_rate).round() as i64
}

fn create_rust_image(converted: FrameVideo) -> eyre::Result<RgbImage> {
    eyre::ensure!(
        converted.format() == Pixel::RGB24 && converted.planes() == 1,
        "The converted frame is not packed RGB24"
    );

    let src_linesize = converted.stride(0);
    let width = usize::try_from(converted.width())?;
    let height = usize::try_from(converted.height())?;
    let data = converted.data(0);
    let trg_linesize = 3 * width;

    // https://stackoverflow.com/a/57666844
    let data = if src_linesize == trg_linesize {
        data[..trg_linesize * height].to_vec()
    } else {
        eyre::ensure!(src_linesize >= trg_linesize, "The frame rows are too short");
        let mut nopadding = vec![0; trg_linesize * height];
        for i in 0..height {
            nopadding[(i * trg_linesize)..((i + 1) * trg_linesize)].copy_from_slice(
                &data[(i * src_linesize)..(i * src_linesize + trg_linesize)],
            );
        }
        nopadding
    };

    RgbImage::from_vec(converted.width(), converted.height(), data)
        .ok_or_else(|| eyre::eyre!("The frame buffer is too small"))
}

fn stream_set_discard_all(stream: &mut ffmpeg::StreamMut<'_>) {
    unsafe {
        let ptr = stream.as_mut_ptr();
        if !ptr.is_null() {
            (*ptr).discard = ffmpeg_sys_next::AVDiscard::AVDISCARD_ALL;
        }
    }
}

/// A copy of FormatContext::seek, except that this accepts a stream_index to seek on.
fn seek<R: ffmpeg::util::range::Range<i64>>(
    input: &mut FormatContext,
    stream_index: usize,
    ts: i64,
    range: R,
) -> Result<(), ffmpeg::Error> {
    let stream_index =
        i32::try_from(stream_index).map_err(|_| ffmpeg::Error::StreamNotFound)?;
    unsafe {
        match ffmpeg_sys_next::avformat_seek_file(
            input.as_mut_ptr(),
            stream_index,
            range.start().cloned().unwrap_or(i64::MIN),
            ts,
            range.end().cloned().unwrap_or(i64::MAX),
            0,
        ) {
            s if s >= 0 => Ok(()),
            e => Err(ffmpeg::Error::from(e)),
        }
    }
}

impl<L: logger::Logger> fmt::Debug for FrameExtractor<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            first_timestamp,
            timebase,
            next_index,
            drained,
            frame_rate,
            frame_count,
            ..
        } = self;

        f.debug_struct("FrameExtractor")
            .field("first_ts", first_timestamp)
            .field(
                "tb",
                &format_args!("{}/{}", timebase.numerator(), timebase.denominator()),
            )
            .field("next_index", next_index)
            .field("drained", drained)
            .field("frame_rate", frame_rate)
            .field("frame_count", frame_count)
            .finish()
    }
}
