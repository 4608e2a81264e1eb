use crate::tts::TtsBackend;
use anyhow::Context;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

const SILENCE_SAMPLE_RATE: u32 = 44100;

/// One produced audio file plus the duration measured from it.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub duration: f64,
}

/// Turns the chunks of one narration unit into a single mp3 in the scratch
/// directory: one backend call per chunk, a lossless stream-copy merge in
/// original order, and an optional shared silence spacer appended to every
/// unit so pauses in the final cut are uniform across backends.
pub struct AudioAssembler {
    dir: PathBuf,
    silence: Option<PathBuf>,
}

impl AudioAssembler {
    pub fn new(dir: PathBuf) -> Self {
        AudioAssembler { dir, silence: None }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Generates the shared silence spacer once per run: a 44.1 kHz sine
    /// attenuated to zero amplitude, encoded to `silence.mp3`. A duration of
    /// zero disables the spacer.
    pub fn prepare_silence(&mut self, duration: f64) -> anyhow::Result<()> {
        if duration <= 0.0 {
            debug!("Silence spacer disabled");
            return Ok(());
        }
        let wav = self.dir.join("silence.wav");
        write_silence_wav(&wav, duration)?;
        let mp3 = self.dir.join("silence.mp3");
        encode_to_mp3(&wav, &mp3)?;
        if let Err(e) = fs::remove_file(&wav) {
            warn!("Could not remove {}: {e}", wav.display());
        }
        info!("Prepared {duration:.2}s silence spacer");
        self.silence = Some(mp3);
        Ok(())
    }

    /// Synthesizes one unit into `<stem>.mp3`. A single chunk goes straight
    /// to the destination; multiple chunks become `<stem>-<i>.part.mp3` files
    /// merged in order with a stream copy, so the merged duration is the
    /// exact sum of the parts. Failed or whitespace-only chunks are skipped
    /// with a warning. The measured duration degrades to zero when the
    /// artifact cannot be read back; a bad unit never aborts the run.
    pub async fn synthesize_unit(
        &self,
        backend: &dyn TtsBackend,
        chunks: &[String],
        voice: Option<&str>,
        stem: &str,
    ) -> anyhow::Result<AudioArtifact> {
        let dest = self.dir.join(format!("{stem}.mp3"));
        let speakable: Vec<&String> = chunks
            .iter()
            .filter(|chunk| {
                if chunk.trim().is_empty() {
                    warn!("Skipping whitespace-only chunk in unit '{stem}'");
                    false
                } else {
                    true
                }
            })
            .collect();
        if speakable.is_empty() {
            anyhow::bail!("unit '{stem}' has no speakable text");
        }

        if speakable.len() == 1 {
            backend.run(speakable[0], &dest, voice).await?;
            if let Some(silence) = &self.silence {
                self.concat(&[dest.clone(), silence.clone()], &dest)?;
            }
        } else {
            let mut parts = Vec::new();
            for (i, chunk) in speakable.iter().enumerate() {
                let part = self.dir.join(format!("{stem}-{i}.part.mp3"));
                match backend.run(chunk.as_str(), &part, voice).await {
                    Ok(()) => parts.push(part),
                    Err(e) => warn!("Chunk {i} of unit '{stem}' failed, skipping: {e}"),
                }
            }
            if parts.is_empty() {
                anyhow::bail!("every chunk of unit '{stem}' failed");
            }
            let mut inputs = parts.clone();
            if let Some(silence) = &self.silence {
                inputs.push(silence.clone());
            }
            self.concat(&inputs, &dest)?;
            for part in &parts {
                if let Err(e) = fs::remove_file(part) {
                    warn!("Could not remove {}: {e}", part.display());
                }
            }
        }

        let duration = match probe_duration(&dest) {
            Ok(d) => d,
            Err(e) => {
                warn!("Could not read duration of {}: {e}", dest.display());
                0.0
            }
        };
        Ok(AudioArtifact {
            path: dest,
            duration,
        })
    }

    /// Lossless merge of `inputs` (all inside the scratch dir) into `dest`
    /// via a concat manifest. The merge lands in a temp file first and is
    /// renamed over the destination, so `dest` may also appear in `inputs`.
    fn concat(&self, inputs: &[PathBuf], dest: &Path) -> anyhow::Result<()> {
        let manifest = self.dir.join("list.txt");
        write_concat_manifest(&manifest, inputs)?;

        let dest_name = file_name(dest)?;
        let merged_name = format!("{dest_name}.merge.mp3");
        let copy_args = ["-y", "-hide_banner", "-loglevel", "error", "-f", "concat",
            "-safe", "0", "-i", "list.txt", "-c", "copy"];
        let status = Command::new("ffmpeg")
            .current_dir(&self.dir)
            .args(copy_args)
            .arg(&merged_name)
            .status()
            .context("spawning ffmpeg for concat")?;
        if !status.success() {
            warn!("Stream-copy concat failed; retrying with re-encode");
            let reencode_args = ["-y", "-hide_banner", "-loglevel", "error", "-f", "concat",
                "-safe", "0", "-i", "list.txt", "-c:a", "libmp3lame"];
            let status = Command::new("ffmpeg")
                .current_dir(&self.dir)
                .args(reencode_args)
                .arg(&merged_name)
                .status()?;
            if !status.success() {
                anyhow::bail!("ffmpeg failed to concatenate into {}", dest.display());
            }
        }
        fs::rename(self.dir.join(&merged_name), dest)?;
        Ok(())
    }
}

/// One `file '<name>'` line per input, the declarative form ffmpeg's concat
/// demuxer reads. Inputs are referenced by file name; ffmpeg runs inside the
/// scratch directory.
pub(crate) fn write_concat_manifest(manifest: &Path, inputs: &[PathBuf]) -> anyhow::Result<()> {
    let mut f = File::create(manifest)?;
    for input in inputs {
        writeln!(f, "file '{}'", file_name(input)?)?;
    }
    Ok(())
}

fn file_name(path: &Path) -> anyhow::Result<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("invalid file name: {}", path.display()))
}

/// Duration measured from the artifact itself, never assumed from input
/// lengths: some providers trim trailing silence, so the header is the only
/// trustworthy source.
pub fn probe_duration(path: &Path) -> anyhow::Result<f64> {
    if path.extension().and_then(|e| e.to_str()) == Some("wav") {
        return wav_duration_seconds(path);
    }
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .context("spawning ffprobe")?;
    if !output.status.success() {
        anyhow::bail!("ffprobe failed for {}", path.display());
    }
    let text = String::from_utf8_lossy(&output.stdout);
    let duration = text
        .trim()
        .parse::<f64>()
        .with_context(|| format!("unparseable ffprobe output {:?}", text.trim()))?;
    Ok(duration)
}

pub fn wav_duration_seconds(path: &Path) -> anyhow::Result<f64> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let samples = reader.len();
    let frames = samples as f64 / spec.channels as f64;
    Ok(frames / spec.sample_rate as f64)
}

fn write_silence_wav(path: &Path, duration: f64) -> anyhow::Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SILENCE_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    let total = (duration * SILENCE_SAMPLE_RATE as f64).round() as u64;
    for n in 0..total {
        let t = n as f64 / SILENCE_SAMPLE_RATE as f64;
        // 440 Hz sine attenuated to zero amplitude
        let sample = (440.0 * 2.0 * std::f64::consts::PI * t).sin() * 0.0;
        writer.write_sample((sample * i16::MAX as f64) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Re-encodes any audio file to mp3. Shared by the silence spacer and the
/// local engine's WAV intermediate.
pub(crate) fn encode_to_mp3(input: &Path, output: &Path) -> anyhow::Result<()> {
    let status = Command::new("ffmpeg")
        .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
        .arg(input)
        .args(["-codec:a", "libmp3lame", "-qscale:a", "4"])
        .arg(output)
        .status()
        .context("spawning ffmpeg for mp3 encode")?;
    if !status.success() {
        anyhow::bail!("ffmpeg failed to encode {}", output.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::SynthesisError;
    use async_trait::async_trait;

    /// The merge tests need the ambient ffmpeg tooling; on machines without
    /// it they skip rather than fail.
    fn ffmpeg_available() -> bool {
        let have = |bin: &str| {
            Command::new(bin)
                .arg("-version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        };
        have("ffmpeg") && have("ffprobe")
    }

    fn make_mp3(dir: &Path, name: &str, seconds: f64) -> PathBuf {
        let wav = dir.join(format!("{name}.wav"));
        write_silence_wav(&wav, seconds).unwrap();
        let mp3 = dir.join(format!("{name}.mp3"));
        encode_to_mp3(&wav, &mp3).unwrap();
        fs::remove_file(&wav).unwrap();
        mp3
    }

    /// Writes a fixed pre-encoded file for every chunk, standing in for a
    /// provider.
    struct FixtureBackend {
        source: PathBuf,
    }

    #[async_trait]
    impl TtsBackend for FixtureBackend {
        fn name(&self) -> &'static str {
            "fixture"
        }

        fn max_chars(&self) -> usize {
            300
        }

        async fn run(
            &self,
            _text: &str,
            destination: &Path,
            _voice: Option<&str>,
        ) -> Result<(), SynthesisError> {
            fs::copy(&self.source, destination)?;
            Ok(())
        }

        fn default_voice(&self) -> Option<String> {
            None
        }

        fn random_voice(&self) -> Option<String> {
            None
        }
    }

    #[test]
    fn merged_duration_is_the_sum_of_its_parts() {
        if !ffmpeg_available() {
            eprintln!("ffmpeg/ffprobe not on PATH; skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let mut assembler = AudioAssembler::new(dir.path().to_path_buf());
        assembler.prepare_silence(0.5).unwrap();
        let silence = assembler.silence.clone().unwrap();

        let a = make_mp3(dir.path(), "0-0.part", 1.0);
        let b = make_mp3(dir.path(), "0-1.part", 0.7);
        let d_a = probe_duration(&a).unwrap();
        let d_b = probe_duration(&b).unwrap();
        let d_silence = probe_duration(&silence).unwrap();

        let dest = dir.path().join("0.mp3");
        assembler
            .concat(&[a, b, silence], &dest)
            .unwrap();
        let merged = probe_duration(&dest).unwrap();

        assert!(
            (merged - (d_a + d_b + d_silence)).abs() < 0.3,
            "merged {merged:.3}s, parts sum {:.3}s",
            d_a + d_b + d_silence
        );
        // the spacer makes every unit measurably longer than its speech
        assert!(merged - (d_a + d_b) >= 0.4, "merged {merged:.3}s");
    }

    #[test]
    fn destination_may_also_be_an_input() {
        if !ffmpeg_available() {
            eprintln!("ffmpeg/ffprobe not on PATH; skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let mut assembler = AudioAssembler::new(dir.path().to_path_buf());
        assembler.prepare_silence(0.5).unwrap();
        let silence = assembler.silence.clone().unwrap();

        let dest = make_mp3(dir.path(), "title", 1.0);
        let before = probe_duration(&dest).unwrap();
        assembler.concat(&[dest.clone(), silence], &dest).unwrap();
        let after = probe_duration(&dest).unwrap();

        assert!(after > before + 0.4, "before {before:.3}s, after {after:.3}s");
        assert!((after - before - 0.5).abs() < 0.3);
    }

    #[tokio::test]
    async fn multi_chunk_unit_merges_in_order_and_cleans_up_parts() {
        if !ffmpeg_available() {
            eprintln!("ffmpeg/ffprobe not on PATH; skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let mut assembler = AudioAssembler::new(dir.path().to_path_buf());
        assembler.prepare_silence(0.5).unwrap();
        let d_silence = probe_duration(assembler.silence.as_ref().unwrap()).unwrap();

        let fixture = make_mp3(dir.path(), "fixture", 1.0);
        let d_one = probe_duration(&fixture).unwrap();
        let backend = FixtureBackend { source: fixture };

        let chunks = vec![
            "First sentence.".to_string(),
            "Second sentence.".to_string(),
            "Third sentence.".to_string(),
        ];
        let artifact = assembler
            .synthesize_unit(&backend, &chunks, None, "0")
            .await
            .unwrap();

        assert!(
            (artifact.duration - (3.0 * d_one + d_silence)).abs() < 0.3,
            "unit {:.3}s, expected {:.3}s",
            artifact.duration,
            3.0 * d_one + d_silence
        );
        assert!(dir.path().join("0.mp3").exists());
        for i in 0..3 {
            assert!(
                !dir.path().join(format!("0-{i}.part.mp3")).exists(),
                "part {i} survived the merge"
            );
        }
        let manifest = fs::read_to_string(dir.path().join("list.txt")).unwrap();
        assert_eq!(
            manifest,
            "file '0-0.part.mp3'\nfile '0-1.part.mp3'\nfile '0-2.part.mp3'\nfile 'silence.mp3'\n"
        );
    }

    #[test]
    fn silence_wav_has_the_requested_duration_and_zero_amplitude() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("silence.wav");
        write_silence_wav(&wav, 0.5).unwrap();

        let duration = wav_duration_seconds(&wav).unwrap();
        assert!((duration - 0.5).abs() < 1e-3, "duration {duration}");

        let mut reader = WavReader::open(&wav).unwrap();
        assert!(reader.samples::<i16>().all(|s| s.unwrap() == 0));
    }

    #[test]
    fn manifest_lists_parts_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("list.txt");
        let inputs = vec![
            dir.path().join("0-0.part.mp3"),
            dir.path().join("0-1.part.mp3"),
            dir.path().join("silence.mp3"),
        ];
        write_concat_manifest(&manifest, &inputs).unwrap();
        let content = fs::read_to_string(&manifest).unwrap();
        assert_eq!(
            content,
            "file '0-0.part.mp3'\nfile '0-1.part.mp3'\nfile 'silence.mp3'\n"
        );
    }

    #[test]
    fn wav_probe_goes_through_hound() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("tone.wav");
        write_silence_wav(&wav, 1.25).unwrap();
        let duration = probe_duration(&wav).unwrap();
        assert!((duration - 1.25).abs() < 1e-3);
    }
}
