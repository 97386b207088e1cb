use rand::Rng;

// Generate a random vector with a given dimension
pub fn generate_random_vector(dimension: usize) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    let mut vector = vec![];
    for _ in 0..dimension {
        vector.push(rng.gen::<f64>());
    }
    vector
}

// Generate `num_points` random points of a given dimension, one Vec per point
pub fn generate_random_points(num_points: usize, dimension: usize) -> Vec<Vec<f64>> {
    (0..num_points)
        .map(|_| generate_random_vector(dimension))
        .collect()
}
