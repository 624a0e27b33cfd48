use shotgroup::{Circle, Mode, Point, ResultSummary, Scale, Session};
use std::error::Error;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage: {} <circles.json> [px_per_mm] [x,y ...]",
            args[0]
        );
        std::process::exit(2);
    }

    let data = std::fs::read_to_string(Path::new(&args[1]))?;
    let circles: Vec<Circle> = serde_json::from_str(&data)?;
    let scale = args.get(2).map(|s| s.parse::<f64>()).transpose()?;
    let scale = scale.map(Scale::new).transpose()?;

    let mut session = Session::default();
    session.on_image_ready(scale);
    let ticket = session.begin_detection();
    session.complete_detection(ticket, Ok(circles));

    // Remaining arguments are clicks in group-analysis mode.
    let clicks = &args[args.len().min(3)..];
    if !clicks.is_empty() {
        session.on_mode_change(Mode::StdDev);
        for c in clicks {
            let (x, y) = c.split_once(',').ok_or("click must be x,y")?;
            let outcome = session.on_pointer_click(Point::new(x.parse()?, y.parse()?));
            println!("click ({}, {}): {:?}", x, y, outcome);
        }
    }

    print!("{}", ResultSummary::from_session(&session));
    Ok(())
}
