use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use anyhow::Context as _;

use crate::encode::sink::{FrameSink, SinkConfig, check_frame};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{VizError, VizResult};
use crate::render::frame::RenderedFrame;

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// x264 constant rate factor.
    pub crf: u8,
}

impl FfmpegSinkOpts {
    /// Options for writing an MP4 to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            crf: 18,
        }
    }
}

/// Spawns the system `ffmpeg` and streams raw RGB24 frames to its stdin.
///
/// When `SinkConfig::audio` is set, that file is muxed as AAC and the output is cut to the
/// shorter of the two streams.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    /// New sink; nothing is spawned until `begin`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            cfg: None,
            last_idx: None,
        }
    }

    /// Arguments passed to `ffmpeg` for `cfg`.
    pub fn command_args(&self, cfg: &SinkConfig) -> Vec<String> {
        let mut args: Vec<String> = vec![if self.opts.overwrite { "-y" } else { "-n" }.into()];
        args.extend(
            [
                "-loglevel",
                "error",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-s",
            ]
            .map(String::from),
        );
        args.push(format!("{}x{}", cfg.width, cfg.height));
        args.extend(input_fps_args(cfg.fps));
        args.extend(["-i", "pipe:0"].map(String::from));

        if let Some(audio) = cfg.audio.as_ref() {
            args.push("-i".into());
            args.push(audio.display().to_string());
            args.extend(["-map", "0:v:0", "-map", "1:a:0"].map(String::from));
        } else {
            args.push("-an".into());
        }
        args.extend(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-crf"].map(String::from));
        args.push(self.opts.crf.to_string());
        if cfg.audio.is_some() {
            args.extend(["-c:a", "aac", "-b:a", "192k", "-shortest"].map(String::from));
        }
        args.extend(["-movflags", "+faststart"].map(String::from));
        args.push(self.opts.out_path.display().to_string());
        args
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> VizResult<()> {
        check_video_config(&cfg)?;
        let out = &self.opts.out_path;
        ensure_parent_dir(out)?;
        if !self.opts.overwrite && out.exists() {
            return Err(VizError::config(format!(
                "refusing to overwrite '{}'",
                out.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(VizError::encode("ffmpeg not found on PATH; it is needed for mp4 output"));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .args(self.command_args(&cfg));

        let mut child = cmd
            .spawn()
            .map_err(|e| VizError::encode(format!("spawn ffmpeg: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| VizError::encode("failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| VizError::encode("failed to open ffmpeg stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut log = Vec::new();
            stderr.read_to_end(&mut log).map(|_| log)
        });

        tracing::info!(
            out = %self.opts.out_path.display(),
            frames = cfg.expected_frames,
            audio = cfg.audio.is_some(),
            "ffmpeg encoder started"
        );
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RenderedFrame) -> VizResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| VizError::encode("ffmpeg sink not started"))?;
        check_frame(cfg, self.last_idx, idx, frame)?;
        self.last_idx = Some(idx);

        self.stdin
            .as_mut()
            .ok_or_else(|| VizError::encode("ffmpeg stdin already closed"))?
            .write_all(frame.as_raw())
            .map_err(|e| VizError::encode(format!("pipe frame {} to ffmpeg: {e}", idx.0)))
    }

    fn end(&mut self) -> VizResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| VizError::encode("ffmpeg sink not started"))?;

        let status = child
            .wait()
            .map_err(|e| VizError::encode(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let log = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| VizError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| VizError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            return Err(VizError::encode(format!(
                "ffmpeg failed ({status}): {}",
                String::from_utf8_lossy(&log).trim()
            )));
        }

        tracing::info!(out = %self.opts.out_path.display(), "video written");
        self.cfg = None;
        Ok(())
    }
}

fn check_video_config(cfg: &SinkConfig) -> VizResult<()> {
    // yuv420p subsamples chroma 2x2.
    if cfg.width == 0 || cfg.height == 0 || cfg.width % 2 != 0 || cfg.height % 2 != 0 {
        return Err(VizError::config(format!(
            "mp4 output needs even, non-zero dimensions, got {}x{}",
            cfg.width, cfg.height
        )));
    }
    match cfg.audio.as_deref() {
        Some(audio) if !audio.is_file() => Err(VizError::config(format!(
            "audio file '{}' not found",
            audio.display()
        ))),
        _ => Ok(()),
    }
}

fn input_fps_args(fps: Fps) -> [String; 2] {
    // `-r` before `-i` sets the rawvideo input rate.
    ["-r".into(), format!("{}/{}", fps.num, fps.den)]
}

/// Create the directory that will hold `path`.
pub fn ensure_parent_dir(path: &Path) -> VizResult<()> {
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create output dir '{}'", dir.display()))?;
    Ok(())
}

/// Whether `ffmpeg -version` runs successfully.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
