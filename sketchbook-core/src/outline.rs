//! Closed vector outlines for filled stroke silhouettes.
//!
//! An [`Outline`] is a typed list of path commands. Its textual form is SVG
//! path data (`M x y Q cx cy x y L x y Z`), which is what the document codec
//! stores and the renderer emits. Bounding boxes come from the typed
//! vertices, so the text form is never re-parsed for geometry.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::geometry::{BoundingBox, Vec2};

/// A single path command with absolute coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    /// Start a new subpath.
    MoveTo(Vec2),
    /// Straight segment to a point.
    LineTo(Vec2),
    /// Quadratic curve through a control point to an end point.
    QuadTo {
        /// Control point.
        ctrl: Vec2,
        /// End point.
        to: Vec2,
    },
    /// Close the current subpath.
    Close,
}

/// Errors produced while parsing path data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathParseError {
    /// The path data contained no commands.
    #[error("path data is empty")]
    Empty,
    /// The path did not begin with a move command.
    #[error("path must start with a move command")]
    MissingMoveTo,
    /// A character that is neither a command, number nor separator.
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedCharacter {
        /// The offending character.
        ch: char,
        /// Byte offset in the input.
        offset: usize,
    },
    /// A command letter this format does not use.
    #[error("unsupported path command '{0}'")]
    UnsupportedCommand(char),
    /// A numeric token could not be parsed or was not finite.
    #[error("invalid number at offset {0}")]
    InvalidNumber(usize),
    /// A command ran out of arguments.
    #[error("command '{0}' is missing arguments")]
    MissingArguments(char),
}

/// A closed vector path describing a filled stroke silhouette.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outline {
    commands: Vec<PathCommand>,
}

impl Outline {
    /// Create an outline from raw commands.
    #[must_use]
    pub fn from_commands(commands: Vec<PathCommand>) -> Self {
        Self { commands }
    }

    /// Emit the smoothed path for a boundary polygon.
    ///
    /// The first vertex becomes a move, interior vertices become quadratic
    /// curves that use the vertex as control point and the midpoint to the
    /// next vertex as end point, the last vertex becomes a line, and the path
    /// is closed. Coordinates are rounded to two decimals.
    #[must_use]
    pub fn from_polygon(vertices: &[Vec2]) -> Self {
        let Some((first, rest)) = vertices.split_first() else {
            return Self::default();
        };

        let mut commands = Vec::with_capacity(vertices.len() + 1);
        commands.push(PathCommand::MoveTo(round_vec(*first)));

        if let Some((last, interior)) = rest.split_last() {
            for (i, ctrl) in interior.iter().enumerate() {
                let next = rest[i + 1];
                commands.push(PathCommand::QuadTo {
                    ctrl: round_vec(*ctrl),
                    to: round_vec(ctrl.midpoint(&next)),
                });
            }
            commands.push(PathCommand::LineTo(round_vec(*last)));
        }

        commands.push(PathCommand::Close);
        Self { commands }
    }

    /// Parse SVG path data restricted to absolute `M`, `L`, `Q` and `Z`.
    ///
    /// # Errors
    ///
    /// Returns a [`PathParseError`] for empty input, unknown commands,
    /// malformed numbers or truncated argument lists.
    pub fn parse(data: &str) -> Result<Self, PathParseError> {
        let tokens = tokenize(data)?;
        if tokens.is_empty() {
            return Err(PathParseError::Empty);
        }

        let mut commands = Vec::new();
        let mut current: Option<char> = None;
        let mut i = 0;

        while i < tokens.len() {
            let cmd = match tokens[i] {
                Token::Command(c) => {
                    i += 1;
                    c
                }
                // Extra coordinate pairs repeat the previous command; after a
                // move they are implicit lines.
                Token::Number(_) => match current {
                    Some('M' | 'L') => 'L',
                    Some('Q') => 'Q',
                    None => return Err(PathParseError::MissingMoveTo),
                    Some(other) => return Err(PathParseError::MissingArguments(other)),
                },
            };

            if commands.is_empty() && cmd != 'M' {
                return Err(PathParseError::MissingMoveTo);
            }

            match cmd {
                'M' => {
                    let [x, y] = take_numbers(&tokens, &mut i, cmd)?;
                    commands.push(PathCommand::MoveTo(Vec2::new(x, y)));
                }
                'L' => {
                    let [x, y] = take_numbers(&tokens, &mut i, cmd)?;
                    commands.push(PathCommand::LineTo(Vec2::new(x, y)));
                }
                'Q' => {
                    let [cx, cy, x, y] = take_numbers(&tokens, &mut i, cmd)?;
                    commands.push(PathCommand::QuadTo {
                        ctrl: Vec2::new(cx, cy),
                        to: Vec2::new(x, y),
                    });
                }
                'Z' | 'z' => commands.push(PathCommand::Close),
                other => return Err(PathParseError::UnsupportedCommand(other)),
            }
            current = Some(cmd.to_ascii_uppercase());
        }

        Ok(Self { commands })
    }

    /// The commands of this outline.
    #[must_use]
    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    /// Check if the outline has no commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Every coordinate in the outline, control points included.
    pub fn vertices(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.commands.iter().flat_map(|cmd| {
            let pair: [Option<Vec2>; 2] = match *cmd {
                PathCommand::MoveTo(p) | PathCommand::LineTo(p) => [Some(p), None],
                PathCommand::QuadTo { ctrl, to } => [Some(ctrl), Some(to)],
                PathCommand::Close => [None, None],
            };
            pair.into_iter().flatten()
        })
    }

    /// Bounding box of all vertices. Control points are included, so the box
    /// always contains the rendered curve.
    #[must_use]
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_vertices(self.vertices())
    }

    /// SVG path data for this outline.
    #[must_use]
    pub fn to_path_data(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Outline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cmd) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match cmd {
                PathCommand::MoveTo(p) => write!(f, "M{} {}", p.x, p.y)?,
                PathCommand::LineTo(p) => write!(f, "L{} {}", p.x, p.y)?,
                PathCommand::QuadTo { ctrl, to } => {
                    write!(f, "Q{} {} {} {}", ctrl.x, ctrl.y, to.x, to.y)?;
                }
                PathCommand::Close => f.write_str("Z")?,
            }
        }
        Ok(())
    }
}

impl FromStr for Outline {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn round_coord(v: f32) -> f32 {
    let rounded = (v * 100.0).round() / 100.0;
    // Avoid emitting "-0".
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn round_vec(v: Vec2) -> Vec2 {
    Vec2::new(round_coord(v.x), round_coord(v.y))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Command(char),
    Number(f32),
}

fn take_numbers<const N: usize>(
    tokens: &[Token],
    i: &mut usize,
    cmd: char,
) -> Result<[f32; N], PathParseError> {
    let mut out = [0.0; N];
    for slot in &mut out {
        match tokens.get(*i) {
            Some(Token::Number(value)) => {
                *slot = *value;
                *i += 1;
            }
            _ => return Err(PathParseError::MissingArguments(cmd)),
        }
    }
    Ok(out)
}

fn tokenize(data: &str) -> Result<Vec<Token>, PathParseError> {
    let bytes = data.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b' ' | b'\t' | b'\n' | b'\r' | b',' => i += 1,
            b'+' | b'-' | b'.' | b'0'..=b'9' => {
                let start = i;
                i = scan_number(bytes, i).ok_or(PathParseError::InvalidNumber(start))?;
                let value: f32 = data[start..i]
                    .parse()
                    .map_err(|_| PathParseError::InvalidNumber(start))?;
                if !value.is_finite() {
                    return Err(PathParseError::InvalidNumber(start));
                }
                tokens.push(Token::Number(value));
            }
            b if b.is_ascii_alphabetic() => {
                tokens.push(Token::Command(char::from(b)));
                i += 1;
            }
            _ => {
                let ch = data[i..].chars().next().unwrap_or('\u{fffd}');
                return Err(PathParseError::UnexpectedCharacter { ch, offset: i });
            }
        }
    }

    Ok(tokens)
}

/// Scan one number starting at `start`, returning the end offset.
fn scan_number(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    if matches!(bytes.get(i), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while matches!(bytes.get(i), Some(b'0'..=b'9')) {
        i += 1;
    }
    let mut digits = i - int_start;

    if bytes.get(i) == Some(&b'.') {
        i += 1;
        let frac_start = i;
        while matches!(bytes.get(i), Some(b'0'..=b'9')) {
            i += 1;
        }
        digits += i - frac_start;
    }

    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_start = j;
        while matches!(bytes.get(j), Some(b'0'..=b'9')) {
            j += 1;
        }
        if j == exp_start {
            return None;
        }
        i = j;
    }

    Some(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ]
    }

    #[test]
    fn test_emission_shape() {
        let outline = Outline::from_polygon(&square());
        assert_eq!(
            outline.to_path_data(),
            "M0 0 Q10 0 10 5 Q10 10 5 10 L0 10 Z"
        );
    }

    #[test]
    fn test_emission_rounds_to_two_decimals() {
        let outline = Outline::from_polygon(&[Vec2::new(1.23456, -0.001), Vec2::new(2.0, 3.005)]);
        let data = outline.to_path_data();
        assert!(data.starts_with("M1.23 0 L2"), "got {data}");
    }

    #[test]
    fn test_empty_polygon() {
        assert!(Outline::from_polygon(&[]).is_empty());
    }

    #[test]
    fn test_parse_round_trip_is_byte_identical() {
        let outline = Outline::from_polygon(&[
            Vec2::new(12.345, 7.5),
            Vec2::new(-3.25, 100.125),
            Vec2::new(44.0, 0.333),
        ]);
        let data = outline.to_path_data();
        let parsed: Outline = data.parse().expect("parse");
        assert_eq!(parsed.to_path_data(), data);
        assert_eq!(parsed, outline);
    }

    #[test]
    fn test_parse_scientific_and_commas() {
        let outline = Outline::parse("M1e2,-2.5E-1 L.5-.5 3,4 Z").expect("parse");
        assert_eq!(outline.commands().len(), 4);
        assert_eq!(outline.commands()[0], PathCommand::MoveTo(Vec2::new(100.0, -0.25)));
        assert_eq!(outline.commands()[1], PathCommand::LineTo(Vec2::new(0.5, -0.5)));
        assert_eq!(outline.commands()[2], PathCommand::LineTo(Vec2::new(3.0, 4.0)));
    }

    #[test]
    fn test_implicit_line_after_move() {
        let outline = Outline::parse("M0 0 5 5 Z").expect("parse");
        assert_eq!(outline.commands()[1], PathCommand::LineTo(Vec2::new(5.0, 5.0)));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Outline::parse("   "), Err(PathParseError::Empty));
        assert_eq!(Outline::parse("L0 0"), Err(PathParseError::MissingMoveTo));
        assert_eq!(Outline::parse("M0"), Err(PathParseError::MissingArguments('M')));
        assert_eq!(
            Outline::parse("M0 0 C1 1 2 2 3 3"),
            Err(PathParseError::UnsupportedCommand('C'))
        );
        assert!(matches!(
            Outline::parse("M0 0 L1 # Z"),
            Err(PathParseError::UnexpectedCharacter { ch: '#', .. })
        ));
        assert!(matches!(
            Outline::parse("M0 0 L1e 2"),
            Err(PathParseError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_bounds_include_control_points() {
        let outline = Outline::parse("M0 0 Q50 -20 10 10 L5 5 Z").expect("parse");
        let bounds = outline.bounds().expect("bounds");
        assert!((bounds.y + 20.0).abs() < f32::EPSILON);
        assert!((bounds.max_x() - 50.0).abs() < f32::EPSILON);
    }
}
