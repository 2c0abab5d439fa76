//! Clearwave CLI
//!
//! Enhances one audio file and prints the quality metrics of the run.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use clearwave_lib::enhancer::EnhancerConfig;
use clearwave_lib::metrics::MetricsRecord;
use clearwave_lib::stft::StftConfig;
use clearwave_lib::window::WindowType;
use clearwave_lib::{enhance_file, PipelineConfig};

#[derive(Parser)]
#[command(name = "clearwave", version, about = "Adaptive speech enhancement")]
struct Args {
    /// Input audio file (wav, flac, ogg, mp3, ...)
    input: PathBuf,

    /// Output WAV file (defaults to <input stem>_enhanced.wav)
    output: Option<PathBuf>,

    /// FFT frame size in samples (power of 2)
    #[arg(long, default_value_t = 2048)]
    fft_size: usize,

    /// Hop between frames in samples
    #[arg(long, default_value_t = 512)]
    hop_size: usize,

    /// Noise adaptation factor, [0, 1); higher adapts slower
    #[arg(long, default_value_t = 0.98)]
    alpha: f64,

    /// Frames seeding the initial noise estimate
    #[arg(long, default_value_t = 5)]
    bootstrap_frames: usize,

    /// Spectral subtraction strength
    #[arg(long, default_value_t = 0.8)]
    subtraction_factor: f64,

    /// Magnitude floor fraction for spectral subtraction, [0, 1]
    #[arg(long, default_value_t = 0.1)]
    subtraction_floor: f64,

    /// Disable the Wiener gain stage
    #[arg(long)]
    no_wiener: bool,

    /// Disable the spectral subtraction stage
    #[arg(long)]
    no_subtraction: bool,
}

fn print_metrics(metrics: &MetricsRecord) {
    println!("Enhancement metrics:");
    println!("  Signal power:        {:.4} dB", metrics.signal_power_db);
    println!("  Noise power:         {:.4} dB", metrics.noise_power_db);
    println!("  Input SNR:           {:.4} dB", metrics.input_snr_db);
    println!("  Wiener gain:         {:.4}", metrics.wiener_gain);
    println!("  Subtraction factor:  {:.4}", metrics.subtraction_factor);
    println!("  Spectral distance:   {:.4}", metrics.spectral_distance);
    println!("  Segmental SNR:       {:.4} dB", metrics.segmental_snr_db);
    println!(
        "  Processing duration: {:.4} s",
        metrics.processing_duration.as_secs_f64()
    );
    if metrics.degraded {
        println!("  Warning: numeric degradation was recovered during processing");
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = PipelineConfig {
        stft: StftConfig {
            fft_size: args.fft_size,
            hop_size: args.hop_size,
            window_type: WindowType::Hann,
        },
        enhancer: EnhancerConfig {
            alpha: args.alpha,
            bootstrap_frames: args.bootstrap_frames,
            wiener: !args.no_wiener,
            spectral_subtraction: !args.no_subtraction,
            subtraction_factor: args.subtraction_factor,
            subtraction_floor: args.subtraction_floor,
        },
    };

    let output = args.output.unwrap_or_else(|| {
        let stem = args
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        args.input.with_file_name(format!("{}_enhanced.wav", stem))
    });

    match enhance_file(&args.input, &output, &config) {
        Ok(metrics) => {
            println!("Enhanced audio written to {}", output.display());
            print_metrics(&metrics);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
