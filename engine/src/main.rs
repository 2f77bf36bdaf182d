use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    smol::block_on(keyclicker::app::start())
}
