use std::error::Error;

use nf_frame::DataFrame;
use nf_stats::{StandardScaler, covariances, means, standard_deviations};

fn main() -> Result<(), Box<dyn Error>> {
    let frame = DataFrame::from_dict([
        ("height", vec![1.62, 1.75, 1.80, 1.68, 1.91]),
        ("weight", vec![58.0, 72.5, 80.1, 63.4, 95.0]),
        ("age", vec![23.0, 35.0, 41.0, 29.0, 52.0]),
    ])?;

    println!("means: {:?}", means(&frame)?);
    println!("standard deviations: {:?}", standard_deviations(&frame)?);
    println!("covariances:\n{}", covariances(&frame)?);

    let mut scaler = StandardScaler::new();
    let scaled = scaler.fit_transform(&frame)?;
    println!("scaled:\n{scaled}");
    println!("scaled means: {:?}", means(&scaled)?);
    Ok(())
}
