use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Vertex index {0} is out of range")]
    VertexOutOfRange(usize),

    #[error("Triangle {0:?} has repeated vertices")]
    DegenerateTriangle([usize; 3]),

    #[error("Surface index {0} is out of range")]
    SurfaceOutOfRange(usize),

    #[error("Object transform is not invertible")]
    SingularTransform,

    #[error("Tree depth {0} is over the supported maximum")]
    TreeTooDeep(usize),

    #[error("No renderers are running")]
    NoRenderers,

    #[error("Render manager is shutting down")]
    ShuttingDown,

    #[error("Render task was aborted before finishing")]
    Aborted,

    #[error("Failed to spawn a render thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
