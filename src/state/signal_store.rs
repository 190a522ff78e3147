use std::collections::BTreeMap;

/// One sampled point of a channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSample {
    pub x: f64,
    pub y: f64,
}

impl SignalSample {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A named time series with a display offset.
///
/// Samples must be sorted by `x`. The offset only shifts the drawn trace;
/// [`SignalChannel::value_at`] always reports unshifted values.
#[derive(Debug, Clone, Default)]
pub struct SignalChannel {
    pub name: String,
    pub samples: Vec<SignalSample>,
    pub offset: f64,
}

impl SignalChannel {
    pub fn new(name: impl Into<String>, samples: Vec<SignalSample>) -> Self {
        Self {
            name: name.into(),
            samples,
            offset: 0.0,
        }
    }

    /// Samples at `x = i / sampling_rate`.
    pub fn from_uniform(name: impl Into<String>, values: &[f64], sampling_rate: f64) -> Self {
        let samples = values
            .iter()
            .enumerate()
            .map(|(i, &y)| SignalSample::new(i as f64 / sampling_rate, y))
            .collect();
        Self::new(name, samples)
    }

    /// Samples at `x = i`.
    pub fn from_indexed(name: impl Into<String>, values: &[f64]) -> Self {
        Self::from_uniform(name, values, 1.0)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Piecewise-linear value at `x`, clamped to the first/last sample outside
    /// the covered range. An empty channel yields 0.0.
    pub fn value_at(&self, x: f64) -> f64 {
        let (first, last) = match (self.samples.first(), self.samples.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return 0.0,
        };

        // First sample whose x is not below the query.
        let idx = self.samples.partition_point(|s| s.x < x);
        if idx == self.samples.len() {
            return last.y;
        }
        if idx == 0 {
            return first.y;
        }

        let lo = self.samples[idx - 1];
        let hi = self.samples[idx];
        if hi.x - lo.x == 0.0 {
            lo.y
        } else {
            lo.y + (hi.y - lo.y) * (x - lo.x) / (hi.x - lo.x)
        }
    }

    /// (min, max) of the y values, if any.
    pub fn y_bounds(&self) -> Option<(f64, f64)> {
        bounds(self.samples.iter().map(|s| s.y))
    }
}

/// Min and max of a sequence.
pub fn bounds(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values.into_iter().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Per-visualizer store of the channels the cursor readout can track.
#[derive(Debug, Clone, Default)]
pub struct SignalStore {
    channels: BTreeMap<String, SignalChannel>,
}

impl SignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace (or create) a channel's samples. The channel's offset is kept.
    pub fn set_channel_data(&mut self, name: &str, samples: Vec<SignalSample>) {
        match self.channels.get_mut(name) {
            Some(channel) => channel.samples = samples,
            None => {
                self.channels.insert(name.to_string(), SignalChannel::new(name, samples));
            }
        }
    }

    pub fn insert(&mut self, channel: SignalChannel) {
        self.channels.insert(channel.name.clone(), channel);
    }

    /// Drop every channel's samples. Offsets survive so a later
    /// [`set_channel_data`](Self::set_channel_data) keeps the last stacking.
    pub fn clear(&mut self) {
        for channel in self.channels.values_mut() {
            channel.samples.clear();
        }
    }

    pub fn channel(&self, name: &str) -> Option<&SignalChannel> {
        self.channels.get(name)
    }

    pub fn set_offset(&mut self, name: &str, offset: f64) {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| SignalChannel::new(name, Vec::new()))
            .offset = offset;
    }

    /// Display offset of a channel, 0.0 if unknown.
    pub fn offset(&self, name: &str) -> f64 {
        self.channels.get(name).map(|c| c.offset).unwrap_or(0.0)
    }

    /// Interpolated value of `name` at `x`; 0.0 when the channel is missing or empty.
    pub fn value_at(&self, name: &str, x: f64) -> f64 {
        self.channels.get(name).map(|c| c.value_at(x)).unwrap_or(0.0)
    }
}
