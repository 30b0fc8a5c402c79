use super::waveform::Waveform;
use crate::timeline::Space;

/// Reference level the window descriptors are measured against
const MIDPOINT: f64 = 0.5;
/// Fraction of the mean zero-crossing rate above which a window may be noise
const ZCR_THRESHOLD_FACTOR: f64 = 0.80;
/// Fraction of the mean energy below which a window may be noise
const ENERGY_THRESHOLD_FACTOR: f64 = 0.40;
const WINDOW_MS: f64 = 1000.0;

/// Per-window descriptors of a one second stretch of audio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowFeatures {
    pub energy: f64,
    pub zero_crossings: u32,
}

/// Finds non-speech intervals in a waveform.
///
/// The waveform is cut into one second windows. A window is non-speech when it
/// has no zero crossings or no energy, or when it crosses zero more often than
/// 80% of the average window while carrying less than 40% of the average
/// energy. Consecutive non-speech windows become one [`Space`] that ends where
/// the next speech window starts.
///
/// A non-speech run reaching the last analyzed window has no speech window to
/// close it and is not reported.
pub fn detect_silence(waveform: &Waveform) -> Vec<Space> {
    let features = window_features(waveform);
    if features.is_empty() {
        log::info!("No complete one second windows to analyze");
        return Vec::new();
    }

    let is_speech = classify(&features);
    let spaces = merge_non_speech(&is_speech);

    log::info!(
        "Detected {} spaces across {} windows",
        spaces.len(),
        is_speech.len()
    );
    for (i, space) in spaces.iter().enumerate() {
        log::debug!(
            "  Space {}: {:.0}ms - {:.0}ms",
            i + 1,
            space.start_ms,
            space.end_ms
        );
    }
    spaces
}

/// Energy and zero-crossing count of every complete one second window
pub fn window_features(waveform: &Waveform) -> Vec<WindowFeatures> {
    let samples_per_second = waveform.samples_per_second();
    if samples_per_second == 0 {
        log::error!("Window size is 0, sample rate might be too low");
        return Vec::new();
    }

    let seconds = waveform.duration_secs().floor() as usize;
    let samples = &waveform.samples;

    (0..seconds)
        .map(|second| second * samples_per_second)
        .take_while(|&start| start + samples_per_second <= samples.len())
        .map(|start| features_of(&samples[start..start + samples_per_second]))
        .collect()
}

fn features_of(window: &[i16]) -> WindowFeatures {
    let energy = window
        .iter()
        .map(|&s| {
            let d = s as f64 - MIDPOINT;
            d * d
        })
        .sum();

    let zero_crossings = window
        .windows(2)
        .filter(|pair| {
            let a = pair[0] as f64 - MIDPOINT;
            let b = pair[1] as f64 - MIDPOINT;
            (a < 0.0) != (b < 0.0)
        })
        .count() as u32;

    WindowFeatures {
        energy,
        zero_crossings,
    }
}

/// Marks each window as speech (`true`) or non-speech (`false`)
pub fn classify(features: &[WindowFeatures]) -> Vec<bool> {
    if features.is_empty() {
        return Vec::new();
    }

    let count = features.len() as f64;
    let mean_zcr = features.iter().map(|f| f.zero_crossings as f64).sum::<f64>() / count;
    let mean_energy = features.iter().map(|f| f.energy).sum::<f64>() / count;
    let zcr_threshold = ZCR_THRESHOLD_FACTOR * mean_zcr;
    let energy_threshold = ENERGY_THRESHOLD_FACTOR * mean_energy;

    log::debug!(
        "ZCR threshold: {:.2}, energy threshold: {:.2}",
        zcr_threshold,
        energy_threshold
    );

    features
        .iter()
        .map(|f| {
            let zcr = f.zero_crossings as f64;
            let non_speech = f.zero_crossings == 0
                || f.energy == 0.0
                || (zcr > zcr_threshold && f.energy < energy_threshold);
            !non_speech
        })
        .collect()
}

fn merge_non_speech(is_speech: &[bool]) -> Vec<Space> {
    let mut spaces = Vec::new();
    let mut i = 0;

    while i < is_speech.len() {
        if is_speech[i] {
            i += 1;
            continue;
        }

        match (i + 1..is_speech.len()).find(|&j| is_speech[j]) {
            Some(j) => {
                spaces.push(Space::from_detection(
                    i as f64 * WINDOW_MS,
                    j as f64 * WINDOW_MS,
                ));
                i = j;
            }
            None => break,
        }
    }

    spaces
}
