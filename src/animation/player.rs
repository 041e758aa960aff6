//! Playback clock of one model: which clip plays, where it is and how time
//! advances at the clip ends.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WrapMode {
    /// Play to the end (or start, for negative speed) and stop there.
    Once,
    #[default]
    Loop,
    /// Bounce between both ends.
    PingPong,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnimationPlayer {
    active_clip: usize,
    time: f32,
    state: PlaybackState,
    wrap: WrapMode,
    speed: f32,
    // +1 or -1; only ever flipped by ping-pong reflection.
    direction: f32,
    enabled: bool,
}

impl Default for AnimationPlayer {
    fn default() -> Self {
        Self {
            active_clip: 0,
            time: 0.0,
            state: PlaybackState::Stopped,
            wrap: WrapMode::Loop,
            speed: 1.0,
            direction: 1.0,
            enabled: true,
        }
    }
}

impl AnimationPlayer {
    pub fn new(wrap: WrapMode) -> Self {
        Self {
            wrap,
            ..Default::default()
        }
    }

    pub fn play(&mut self) {
        self.state = PlaybackState::Playing;
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == PlaybackState::Paused {
            self.state = PlaybackState::Playing;
        }
    }

    /// Stop and rewind to the start.
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.time = 0.0;
        self.direction = 1.0;
    }

    /// Switch clips. The clock rewinds; the playback state is kept.
    pub fn set_clip(&mut self, clip: usize) {
        self.active_clip = clip;
        self.time = 0.0;
        self.direction = 1.0;
    }

    pub fn set_speed(&mut self, speed: f32) {
        if speed.is_finite() {
            self.speed = speed;
        }
    }

    pub fn set_wrap(&mut self, wrap: WrapMode) {
        self.wrap = wrap;
        self.direction = 1.0;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn active_clip(&self) -> usize {
        self.active_clip
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn wrap(&self) -> WrapMode {
        self.wrap
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Advance the clock of a clip lasting `duration` seconds by `dt`.
    ///
    /// Only a playing, enabled player moves. Afterwards `0 <= time <= duration`
    /// holds in every wrap mode, and `time < duration` under [`WrapMode::Loop`].
    pub fn advance_time(&mut self, dt: f32, duration: f32) {
        if self.state != PlaybackState::Playing || !self.enabled {
            return;
        }
        if !(duration > 0.0) || !duration.is_finite() {
            self.time = 0.0;
            return;
        }
        let step = dt * self.speed;
        if !step.is_finite() {
            return;
        }

        match self.wrap {
            WrapMode::Loop => {
                let time = (self.time + step).rem_euclid(duration);
                // rem_euclid may round up to `duration` for tiny negative inputs.
                self.time = if time >= duration { 0.0 } else { time };
            }
            WrapMode::Once => {
                let time = self.time + step;
                if step > 0.0 && time >= duration {
                    self.time = duration;
                    self.state = PlaybackState::Stopped;
                } else if step < 0.0 && time <= 0.0 {
                    self.time = 0.0;
                    self.state = PlaybackState::Stopped;
                } else {
                    self.time = time.clamp(0.0, duration);
                }
            }
            WrapMode::PingPong => {
                let period = 2.0 * duration;
                // Unfold the bounce into a phase on [0, 2d): rising on the
                // first half, falling on the second.
                let phase = if self.direction > 0.0 {
                    self.time
                } else {
                    period - self.time
                };
                let phase = (phase + step).rem_euclid(period);
                if phase <= duration {
                    self.time = phase;
                    self.direction = 1.0;
                } else {
                    self.time = (period - phase).clamp(0.0, duration);
                    self.direction = -1.0;
                }
            }
        }
    }
}
