//! Synthetic pointer clicks and key chords

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Result};
use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use tracing::debug;
use wakeclick_vision::Point;

/// Interval between intermediate pointer positions while gliding.
const GLIDE_STEP: Duration = Duration::from_millis(10);

/// Pointer and keyboard output.
pub trait Pointer {
    fn position(&mut self) -> Result<Point>;

    /// Jump straight to `target`.
    fn move_to(&mut self, target: Point) -> Result<()>;

    fn press(&mut self) -> Result<()>;

    fn release(&mut self) -> Result<()>;

    /// Press every key of `chord` in order, then release in reverse.
    fn send_chord(&mut self, chord: &KeyChord) -> Result<()>;
}

/// Timing of one click sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickTiming {
    pub approach: Duration,
    pub hold: Duration,
    pub park: Duration,
}

impl Default for ClickTiming {
    fn default() -> Self {
        Self {
            approach: Duration::from_millis(150),
            hold: Duration::from_millis(100),
            park: Duration::from_millis(100),
        }
    }
}

impl ClickTiming {
    /// No animation and no hold.
    pub const fn instant() -> Self {
        Self {
            approach: Duration::ZERO,
            hold: Duration::ZERO,
            park: Duration::ZERO,
        }
    }
}

/// Where the pointer rests after a click.
pub const PARK_POSITION: Point = Point::new(0, 0);

/// Move to `target` by linear interpolation over `duration`.
pub fn glide<P: Pointer + ?Sized>(pointer: &mut P, target: Point, duration: Duration) -> Result<()> {
    let steps = (duration.as_millis() / GLIDE_STEP.as_millis()) as i32;
    if steps > 1 {
        let start = pointer.position()?;
        let began = Instant::now();
        for i in 1..steps {
            let x = start.x + (target.x - start.x) * i / steps;
            let y = start.y + (target.y - start.y) * i / steps;
            pointer.move_to(Point::new(x, y))?;
            let due = GLIDE_STEP * i as u32;
            if let Some(wait) = due.checked_sub(began.elapsed()) {
                std::thread::sleep(wait);
            }
        }
    }
    pointer.move_to(target)
}

/// Glide to `target`, press, hold, release, then park the pointer at (0, 0).
pub fn click_at<P: Pointer + ?Sized>(pointer: &mut P, target: Point, timing: ClickTiming) -> Result<()> {
    debug!("Clicking at {}", target);
    glide(pointer, target, timing.approach)?;
    pointer.press()?;
    if !timing.hold.is_zero() {
        std::thread::sleep(timing.hold);
    }
    pointer.release()?;
    glide(pointer, PARK_POSITION, timing.park)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordKey {
    Alt,
    Control,
    Shift,
    Super,
    Space,
    Tab,
    Enter,
    Escape,
    F(u8),
    Char(char),
}

impl ChordKey {
    fn parse(token: &str) -> Result<Self> {
        let lower = token.to_ascii_lowercase();
        let key = match lower.as_str() {
            "alt" => ChordKey::Alt,
            "ctrl" | "control" => ChordKey::Control,
            "shift" => ChordKey::Shift,
            "super" | "win" | "meta" | "cmd" => ChordKey::Super,
            "space" => ChordKey::Space,
            "tab" => ChordKey::Tab,
            "enter" | "return" => ChordKey::Enter,
            "esc" | "escape" => ChordKey::Escape,
            _ => {
                if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                    if (1..=12).contains(&n) {
                        return Ok(ChordKey::F(n));
                    }
                }
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => ChordKey::Char(c),
                    _ => bail!("Unknown key \"{}\"", token),
                }
            }
        };
        Ok(key)
    }
}

/// Keys pressed together, e.g. `alt+space`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    keys: Vec<ChordKey>,
}

impl KeyChord {
    pub fn keys(&self) -> &[ChordKey] {
        &self.keys
    }
}

impl FromStr for KeyChord {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let keys = s
            .split('+')
            .map(str::trim)
            .map(|token| {
                if token.is_empty() {
                    Err(anyhow!("Empty key in chord \"{}\"", s))
                } else {
                    ChordKey::parse(token)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { keys })
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .keys
            .iter()
            .map(|k| match k {
                ChordKey::Alt => "alt".to_string(),
                ChordKey::Control => "ctrl".to_string(),
                ChordKey::Shift => "shift".to_string(),
                ChordKey::Super => "super".to_string(),
                ChordKey::Space => "space".to_string(),
                ChordKey::Tab => "tab".to_string(),
                ChordKey::Enter => "enter".to_string(),
                ChordKey::Escape => "escape".to_string(),
                ChordKey::F(n) => format!("f{}", n),
                ChordKey::Char(c) => c.to_string(),
            })
            .collect();
        f.write_str(&names.join("+"))
    }
}

/// [`Pointer`] backed by enigo.
pub struct EnigoPointer {
    enigo: Enigo,
}

impl EnigoPointer {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| anyhow!("Failed to initialize input synthesis: {}", e))?;
        Ok(Self { enigo })
    }
}

fn enigo_key(key: ChordKey) -> Key {
    match key {
        ChordKey::Alt => Key::Alt,
        ChordKey::Control => Key::Control,
        ChordKey::Shift => Key::Shift,
        ChordKey::Super => Key::Meta,
        ChordKey::Space => Key::Space,
        ChordKey::Tab => Key::Tab,
        ChordKey::Enter => Key::Return,
        ChordKey::Escape => Key::Escape,
        ChordKey::F(1) => Key::F1,
        ChordKey::F(2) => Key::F2,
        ChordKey::F(3) => Key::F3,
        ChordKey::F(4) => Key::F4,
        ChordKey::F(5) => Key::F5,
        ChordKey::F(6) => Key::F6,
        ChordKey::F(7) => Key::F7,
        ChordKey::F(8) => Key::F8,
        ChordKey::F(9) => Key::F9,
        ChordKey::F(10) => Key::F10,
        ChordKey::F(11) => Key::F11,
        ChordKey::F(_) => Key::F12,
        ChordKey::Char(c) => Key::Unicode(c),
    }
}

impl Pointer for EnigoPointer {
    fn position(&mut self) -> Result<Point> {
        let (x, y) = self
            .enigo
            .location()
            .map_err(|e| anyhow!("Failed to read pointer position: {}", e))?;
        Ok(Point::new(x, y))
    }

    fn move_to(&mut self, target: Point) -> Result<()> {
        self.enigo
            .move_mouse(target.x, target.y, Coordinate::Abs)
            .map_err(|e| anyhow!("Failed to move pointer to {}: {}", target, e))
    }

    fn press(&mut self) -> Result<()> {
        self.enigo
            .button(Button::Left, Direction::Press)
            .map_err(|e| anyhow!("Failed to press button: {}", e))
    }

    fn release(&mut self) -> Result<()> {
        self.enigo
            .button(Button::Left, Direction::Release)
            .map_err(|e| anyhow!("Failed to release button: {}", e))
    }

    fn send_chord(&mut self, chord: &KeyChord) -> Result<()> {
        for key in chord.keys() {
            self.enigo
                .key(enigo_key(*key), Direction::Press)
                .map_err(|e| anyhow!("Failed to press {}: {}", chord, e))?;
        }
        for key in chord.keys().iter().rev() {
            self.enigo
                .key(enigo_key(*key), Direction::Release)
                .map_err(|e| anyhow!("Failed to release {}: {}", chord, e))?;
        }
        Ok(())
    }
}
