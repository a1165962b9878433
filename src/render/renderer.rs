//! Scene renderer
//!
//! A pure function from (frame, face, game state, tilt) to draw commands.
//! Nothing it receives is mutated.

use crate::game::constants::{canvas, player};
use crate::game::state::{GameState, Lane, Obstacle, Phase};
use crate::render::commands::{palette, Align, Color, DrawCommand};
use crate::tracking::{FacialLandmarks, TiltReading};
use crate::vision::Frame;

const TRACKER_RADIUS: f32 = 3.0;
const ROAD_LINE_WIDTH: f32 = 4.0;
const HUD_FONT: f32 = 24.0;
const HINT_FONT: f32 = 18.0;
const LANE_DOT_RADIUS: f32 = 15.0;
/// Lane indicator centres as fractions of the canvas width
const LANE_DOT_X: [f32; 3] = [0.2, 0.5, 0.8];

/// Everything the renderer looks at for one frame
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub frame: Option<&'a Frame>,
    pub face: Option<&'a FacialLandmarks>,
    pub state: &'a GameState,
    pub tilt: Option<&'a TiltReading>,
}

/// Build the draw list for one frame, back to front
pub fn render(scene: &Scene<'_>) -> Vec<DrawCommand> {
    let mut out = Vec::with_capacity(16 + scene.state.obstacles.len() * 2);

    draw_background(&mut out, scene.frame);
    if let Some(face) = scene.face {
        draw_trackers(&mut out, face);
    }
    draw_road(&mut out);
    draw_player(&mut out, scene.state.player_lane);
    for obs in &scene.state.obstacles {
        draw_obstacle(&mut out, obs);
    }
    draw_hud(&mut out, scene.state, scene.tilt);
    draw_status(&mut out, scene.state);

    out
}

fn rect(out: &mut Vec<DrawCommand>, x: f32, y: f32, w: f32, h: f32, color: Color) {
    out.push(DrawCommand::FillRect { x, y, w, h, color });
}

fn text(out: &mut Vec<DrawCommand>, x: f32, y: f32, size: f32, align: Align, color: Color, s: String) {
    out.push(DrawCommand::Text {
        x,
        y,
        size,
        align,
        color,
        text: s,
    });
}

fn draw_background(out: &mut Vec<DrawCommand>, frame: Option<&Frame>) {
    match frame {
        Some(frame) => out.push(DrawCommand::Frame {
            frame: frame.clone(),
            x: 0.0,
            y: 0.0,
            w: canvas::WIDTH,
            h: canvas::HEIGHT,
        }),
        None => {
            rect(out, 0.0, 0.0, canvas::WIDTH, canvas::HEIGHT, palette::NO_SIGNAL);
            text(
                out,
                canvas::WIDTH / 2.0,
                canvas::HEIGHT / 2.0,
                20.0,
                Align::Center,
                palette::WHITE,
                "Waiting for Camera...".to_string(),
            );
        }
    }
}

fn draw_trackers(out: &mut Vec<DrawCommand>, face: &FacialLandmarks) {
    if let Some((left, right)) = face.eye_corners() {
        for p in [left, right] {
            out.push(DrawCommand::FillCircle {
                cx: p.x,
                cy: p.y,
                radius: TRACKER_RADIUS,
                color: palette::TRACKER,
            });
        }
    }
}

fn draw_road(out: &mut Vec<DrawCommand>) {
    for i in 1..canvas::LANE_COUNT {
        let x = canvas::LANE_WIDTH * i as f32;
        out.push(DrawCommand::Line {
            x0: x,
            y0: 0.0,
            x1: x,
            y1: canvas::HEIGHT,
            width: ROAD_LINE_WIDTH,
            color: palette::ROAD_LINE,
        });
    }
}

fn draw_player(out: &mut Vec<DrawCommand>, lane: Lane) {
    let x = lane.car_x();
    let size = player::CAR_SIZE;
    rect(out, x, player::Y, size, size, palette::PLAYER);
    // Windshield
    rect(out, x + 10.0, player::Y + 10.0, size - 20.0, 15.0, palette::BLACK);
}

fn draw_obstacle(out: &mut Vec<DrawCommand>, obs: &Obstacle) {
    let x = obs.lane.car_x();
    let size = player::CAR_SIZE;
    rect(out, x, obs.y, size, size, palette::OBSTACLE);
    // Danger stripe
    rect(out, x + 10.0, obs.y + 10.0, size - 20.0, 5.0, palette::WHITE);
}

fn draw_hud(out: &mut Vec<DrawCommand>, state: &GameState, tilt: Option<&TiltReading>) {
    text(out, 10.0, 30.0, HUD_FONT, Align::Left, palette::WHITE, format!("Score: {}", state.score));

    let angle = tilt.map(|t| t.angle_deg).unwrap_or(0.0);
    text(
        out,
        canvas::WIDTH - 10.0,
        30.0,
        HUD_FONT,
        Align::Right,
        palette::WHITE,
        format!("Tilt: {:.1}°", angle),
    );

    for (lane, fx) in Lane::ALL.iter().zip(LANE_DOT_X) {
        let color = if *lane == state.player_lane {
            palette::LANE_ACTIVE
        } else {
            palette::LANE_IDLE
        };
        out.push(DrawCommand::FillCircle {
            cx: canvas::WIDTH * fx,
            cy: canvas::HEIGHT - 20.0 - LANE_DOT_RADIUS,
            radius: LANE_DOT_RADIUS,
            color,
        });
    }

    text(
        out,
        canvas::WIDTH / 2.0,
        canvas::HEIGHT - 60.0,
        HINT_FONT,
        Align::Center,
        palette::HINT,
        "Tilt your head LEFT or RIGHT to switch lanes!".to_string(),
    );
}

fn draw_status(out: &mut Vec<DrawCommand>, state: &GameState) {
    let (title, detail, action) = match &state.phase {
        Phase::Running => return,
        Phase::Idle => (
            "Ready to Race!".to_string(),
            "Make sure your camera is on and connected.".to_string(),
            "Type 'start' to play",
        ),
        Phase::GameOver { reason } => (
            "Game Over".to_string(),
            format!("{} Final Score: {}", reason, state.score),
            "Type 'restart' to play again",
        ),
    };

    let cx = canvas::WIDTH / 2.0;
    let cy = canvas::HEIGHT / 2.0;
    rect(out, cx - 200.0, cy - 70.0, 400.0, 140.0, palette::OVERLAY);
    text(out, cx, cy - 30.0, HUD_FONT, Align::Center, palette::WHITE, title);
    text(out, cx, cy + 5.0, HINT_FONT, Align::Center, palette::HINT, detail);
    text(out, cx, cy + 40.0, HINT_FONT, Align::Center, palette::PLAYER, action.to_string());
}
