use incremental_pca::IncrementalPCA;
use ndarray::Array2;

fn main() {
    // A thin cloud stretched along the line y = x.
    let data = Array2::from_shape_fn((200, 2), |(i, j)| {
        let t = (i as f64 - 100.0) / 10.0;
        let wobble = ((i * 7919) % 13) as f64 / 13.0 - 0.5;
        if j == 0 { t - wobble } else { t + wobble }
    });

    let mut ipca = IncrementalPCA::new(2, 2).expect("valid dimensions");
    ipca.initialize(data.slice(ndarray::s![..20, ..]))
        .expect("initialisation failed");
    for row in data.rows().into_iter().skip(20) {
        ipca.update(row).expect("update failed");
    }

    let leading = ipca.eigenvectors().column(0);
    println!("Absorbed {} samples", ipca.n_samples());
    println!("Leading axis: {:?} ({:.2} degrees)", leading, (leading[1] / leading[0]).atan().to_degrees());
    println!("Eigenvalues: {:?}", ipca.eigenvalues());
    println!("Explained variance ratio: {:?}", ipca.explained_variance_ratio());
}
