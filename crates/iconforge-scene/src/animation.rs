//! Keyframe curves for translate / rotate / scale channels

use iconforge_core::Transform;
use serde::{Deserialize, Serialize};

/// A single key on a curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Frame the key sits on
    pub frame: f64,
    /// Attribute value at `frame`
    pub value: f64,
}

impl Keyframe {
    /// Key at `frame` with `value`
    pub fn new(frame: f64, value: f64) -> Self {
        Self { frame, value }
    }
}

/// Keys on one scalar attribute, kept sorted by frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Keyframe>", into = "Vec<Keyframe>")]
pub struct Curve {
    keys: Vec<Keyframe>,
}

impl From<Vec<Keyframe>> for Curve {
    fn from(mut keys: Vec<Keyframe>) -> Self {
        keys.sort_by(|a, b| a.frame.total_cmp(&b.frame));
        keys.dedup_by(|later, earlier| later.frame == earlier.frame);
        Self { keys }
    }
}

impl From<Curve> for Vec<Keyframe> {
    fn from(curve: Curve) -> Self {
        curve.keys
    }
}

impl Curve {
    /// Keys in frame order
    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    /// No keys at all
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Insert a key, replacing any key on the same frame
    pub fn set_key(&mut self, frame: f64, value: f64) {
        match self.keys.binary_search_by(|k| k.frame.total_cmp(&frame)) {
            Ok(index) => self.keys[index].value = value,
            Err(index) => self.keys.insert(index, Keyframe::new(frame, value)),
        }
    }

    /// Frames of keys within `[start, end]`
    pub fn key_times_in(&self, start: f64, end: f64) -> impl Iterator<Item = f64> + '_ {
        self.keys
            .iter()
            .filter(move |k| k.frame >= start && k.frame <= end)
            .map(|k| k.frame)
    }

    /// Replace every key inside `[start, end]` with `samples`
    pub fn replace_range(&mut self, start: f64, end: f64, samples: impl IntoIterator<Item = Keyframe>) {
        self.keys.retain(|k| k.frame < start || k.frame > end);
        for key in samples {
            self.set_key(key.frame, key.value);
        }
    }

    /// Linearly interpolated value, held constant outside the keyed range
    pub fn evaluate(&self, frame: f64) -> Option<f64> {
        let first = self.keys.first()?;
        let last = self.keys.last()?;
        if frame <= first.frame {
            return Some(first.value);
        }
        if frame >= last.frame {
            return Some(last.value);
        }

        let next = self.keys.partition_point(|k| k.frame <= frame);
        let (a, b) = (self.keys[next - 1], self.keys[next]);
        let t = (frame - a.frame) / (b.frame - a.frame);
        Some(a.value + (b.value - a.value) * t)
    }
}

/// Transform channel groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Translation curves
    Translate,
    /// Rotation curves
    Rotate,
    /// Scale curves
    Scale,
}

impl Channel {
    /// Every channel group
    pub const ALL: [Channel; 3] = [Channel::Translate, Channel::Rotate, Channel::Scale];

    /// Attribute name prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Translate => "translate",
            Channel::Rotate => "rotate",
            Channel::Scale => "scale",
        }
    }
}

/// X/Y/Z curves for each transform channel group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationCurves {
    /// Translate X/Y/Z
    pub translate: [Curve; 3],
    /// Rotate X/Y/Z
    pub rotate: [Curve; 3],
    /// Scale X/Y/Z
    pub scale: [Curve; 3],
}

impl AnimationCurves {
    /// X/Y/Z curves of one channel group
    pub fn channel(&self, channel: Channel) -> &[Curve; 3] {
        match channel {
            Channel::Translate => &self.translate,
            Channel::Rotate => &self.rotate,
            Channel::Scale => &self.scale,
        }
    }

    /// Mutable X/Y/Z curves of one channel group
    pub fn channel_mut(&mut self, channel: Channel) -> &mut [Curve; 3] {
        match channel {
            Channel::Translate => &mut self.translate,
            Channel::Rotate => &mut self.rotate,
            Channel::Scale => &mut self.scale,
        }
    }

    /// No keys on any curve
    pub fn is_empty(&self) -> bool {
        Channel::ALL
            .iter()
            .all(|&c| self.channel(c).iter().all(Curve::is_empty))
    }

    /// Key times hit by a `[start, end]` query on a channel group,
    /// one entry per keyed axis curve
    pub fn key_times(&self, channel: Channel, start: f64, end: f64) -> Vec<f64> {
        self.channel(channel)
            .iter()
            .flat_map(|curve| curve.key_times_in(start, end))
            .collect()
    }

    /// Whether any channel has keys inside `[start, end]`
    pub fn has_keys_in(&self, start: f64, end: f64) -> bool {
        Channel::ALL
            .iter()
            .any(|&c| !self.key_times(c, start, end).is_empty())
    }

    /// Evaluate the transform at `frame`; unkeyed axes keep `base` values
    pub fn sample(&self, base: &Transform, frame: f64) -> Transform {
        let eval = |curves: &[Curve; 3], fallback: [f64; 3]| {
            let mut out = fallback;
            for (axis, curve) in curves.iter().enumerate() {
                if let Some(value) = curve.evaluate(frame) {
                    out[axis] = value;
                }
            }
            out
        };

        Transform {
            translate: eval(&self.translate, base.translate),
            rotate: eval(&self.rotate, base.rotate),
            scale: eval(&self.scale, base.scale),
        }
    }

    /// Key every axis of every channel at `frame`
    pub fn key_all(&mut self, frame: f64, transform: &Transform) {
        for axis in 0..3 {
            self.translate[axis].set_key(frame, transform.translate[axis]);
            self.rotate[axis].set_key(frame, transform.rotate[axis]);
            self.scale[axis].set_key(frame, transform.scale[axis]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(keys: &[(f64, f64)]) -> Curve {
        keys.iter().map(|&(f, v)| Keyframe::new(f, v)).collect::<Vec<_>>().into()
    }

    #[test]
    fn test_curve_sorted_and_deduped() {
        let c = curve(&[(5.0, 1.0), (1.0, 0.0), (5.0, 2.0)]);
        assert_eq!(c.keys().len(), 2);
        assert_eq!(c.keys()[0].frame, 1.0);
    }

    #[test]
    fn test_evaluate_interpolates_and_holds() {
        let c = curve(&[(0.0, 0.0), (10.0, 5.0)]);
        assert_eq!(c.evaluate(-3.0), Some(0.0));
        assert_eq!(c.evaluate(4.0), Some(2.0));
        assert_eq!(c.evaluate(20.0), Some(5.0));
        assert_eq!(Curve::default().evaluate(1.0), None);
    }

    #[test]
    fn test_replace_range_keeps_outside_keys() {
        let mut c = curve(&[(0.0, 1.0), (2.5, 9.0), (10.0, 3.0)]);
        c.replace_range(1.0, 5.0, [Keyframe::new(1.0, 4.0), Keyframe::new(2.0, 4.0)]);

        let frames: Vec<f64> = c.keys().iter().map(|k| k.frame).collect();
        assert_eq!(frames, vec![0.0, 1.0, 2.0, 10.0]);
    }

    #[test]
    fn test_key_times_counts_axes() {
        let mut curves = AnimationCurves::default();
        curves.key_all(1.0, &Transform::IDENTITY);
        curves.translate[0].set_key(2.0, 1.0);

        assert_eq!(curves.key_times(Channel::Translate, 1.0, 1.0).len(), 3);
        assert_eq!(curves.key_times(Channel::Translate, 2.0, 2.0).len(), 1);
        assert!(curves.has_keys_in(2.0, 2.0));
        assert!(!curves.has_keys_in(3.0, 8.0));
    }

    #[test]
    fn test_sample_falls_back_to_base() {
        let mut curves = AnimationCurves::default();
        curves.rotate[1] = curve(&[(0.0, 0.0), (4.0, 90.0)]);
        let base = Transform::from_translation(1.0, 2.0, 3.0);

        let sampled = curves.sample(&base, 2.0);
        assert_eq!(sampled.translate, [1.0, 2.0, 3.0]);
        assert_eq!(sampled.rotate, [0.0, 45.0, 0.0]);
    }
}
