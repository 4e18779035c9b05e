use std::error::Error;

use nf_io::{CsvOptions, read_csv_str};
use nf_pca::{Decomposition, Pca, PcaInput, PcaOptions};

const MEASUREMENTS: &str = "\
sepal_length,sepal_width,petal_length,petal_width
5.1,3.5,1.4,0.2
4.9,3.0,1.4,0.2
7.0,3.2,4.7,1.4
6.4,3.2,4.5,1.5
6.3,3.3,6.0,2.5
5.8,2.7,5.1,1.9
";

fn main() -> Result<(), Box<dyn Error>> {
    let frame = read_csv_str(MEASUREMENTS, &CsvOptions::default())?;

    let options = PcaOptions::default()
        .with_center_and_scale(true)
        .with_method(Decomposition::Svd);
    let mut pca = Pca::new();
    let scores = pca.fit_transform(&frame, &options, 2)?;
    println!("eigenvalues: {:?}", pca.eigenvalues());
    println!("eigenvectors:\n{}", pca.eigen_information()?);
    println!("scores:\n{scores}");

    let covariance = nf_stats::covariances(&frame)?;
    let mut from_covariance = Pca::new();
    from_covariance.fit(&covariance, &PcaOptions::default().with_input(PcaInput::Covariance))?;
    println!("covariance eigenvalues: {:?}", from_covariance.eigenvalues());
    Ok(())
}
